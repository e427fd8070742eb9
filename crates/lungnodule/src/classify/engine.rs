use super::decision::Decision;
use super::rules::{CompiledCondition, CompiledRule, CompiledRules};
use crate::extract::size::max_size_in;
use crate::text::{matches, Phrase, Scope, Sentence};
use std::sync::Arc;

/// Progress of one evaluation, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Pending,
    Evaluating(u32),
    Matched(u32),
    Exhausted,
}

/// A document prepared for rule evaluation.
pub struct Document<'a> {
    text: &'a str,
    sentences: &'a [Sentence],
    scope: Scope,
}

impl<'a> Document<'a> {
    pub fn new(text: &'a str, sentences: &'a [Sentence]) -> Self {
        Self {
            text,
            sentences,
            scope: Scope::new(text),
        }
    }
}

/// Decision plus the indexes of the sentences that satisfied the matched rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub decision: Decision,
    pub witnesses: Vec<usize>,
}

#[derive(Clone, Copy)]
enum Ctx<'d, 'a> {
    Document(&'d Document<'a>),
    Sentence(&'d Sentence),
}

impl Ctx<'_, '_> {
    fn scope(&self) -> &Scope {
        match self {
            Ctx::Document(doc) => &doc.scope,
            Ctx::Sentence(sentence) => sentence.scope(),
        }
    }

    fn text(&self) -> &str {
        match self {
            Ctx::Document(doc) => doc.text,
            Ctx::Sentence(sentence) => &sentence.text,
        }
    }
}

/// Ordered, first-match-wins evaluation of a compiled rule table.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<CompiledRules>,
}

impl RuleEngine {
    pub fn new(rules: Arc<CompiledRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn classify(&self, doc: &Document<'_>) -> Outcome {
        self.classify_observed(doc, &mut |_| {})
    }

    /// Classify, reporting each state transition to `observer`.
    ///
    /// Rules after the first match are never evaluated.
    pub fn classify_observed(
        &self,
        doc: &Document<'_>,
        observer: &mut dyn FnMut(EngineState),
    ) -> Outcome {
        observer(EngineState::Pending);

        for rule in &self.rules.rules {
            observer(EngineState::Evaluating(rule.id));
            let mut witnesses = Vec::new();
            if self.eval_rule(rule, doc, &mut witnesses) {
                observer(EngineState::Matched(rule.id));
                witnesses.sort_unstable();
                witnesses.dedup();
                return Outcome {
                    decision: Decision::Matched {
                        rule: rule.id,
                        label: Arc::clone(&rule.label),
                    },
                    witnesses,
                };
            }
        }

        observer(EngineState::Exhausted);
        Outcome {
            decision: Decision::NoMatch {
                label: Arc::clone(&self.rules.default_label),
            },
            witnesses: Vec::new(),
        }
    }

    fn eval_rule(&self, rule: &CompiledRule, doc: &Document<'_>, witnesses: &mut Vec<usize>) -> bool {
        eval(&rule.when, Ctx::Document(doc), witnesses)
    }
}

fn any_phrase(scope: &Scope, phrases: &[Phrase]) -> bool {
    phrases.iter().any(|p| matches(scope, p))
}

/// Evaluate `condition`, appending witness sentences only for branches that held.
fn eval(condition: &CompiledCondition, ctx: Ctx<'_, '_>, witnesses: &mut Vec<usize>) -> bool {
    match condition {
        CompiledCondition::Phrases(phrases) => any_phrase(ctx.scope(), phrases),
        CompiledCondition::All(items) => {
            let mut local = Vec::new();
            for item in items {
                if !eval(item, ctx, &mut local) {
                    return false;
                }
            }
            witnesses.extend(local);
            true
        }
        CompiledCondition::Any(items) => {
            let mut any = false;
            for item in items {
                let mut local = Vec::new();
                if eval(item, ctx, &mut local) {
                    any = true;
                    witnesses.extend(local);
                }
            }
            any
        }
        CompiledCondition::Not(inner) => !eval(inner, ctx, &mut Vec::new()),
        CompiledCondition::AnySentence(inner) => {
            let mut any = false;
            for sentence in sentences(ctx) {
                if eval(inner, Ctx::Sentence(sentence), &mut Vec::new()) {
                    any = true;
                    witnesses.push(sentence.index);
                }
            }
            any
        }
        CompiledCondition::EverySentence(inner) => {
            let all = sentences(ctx)
                .iter()
                .all(|s| eval(inner, Ctx::Sentence(s), &mut Vec::new()));
            if all {
                witnesses.extend(sentences(ctx).iter().map(|s| s.index));
            }
            all
        }
        CompiledCondition::FirstSentence(inner) => {
            eval_one(inner, sentences(ctx).first(), witnesses)
        }
        CompiledCondition::LastSentence(inner) => {
            eval_one(inner, sentences(ctx).last(), witnesses)
        }
        CompiledCondition::LastSentenceWith { phrases, then } => {
            let last = sentences(ctx)
                .iter()
                .rev()
                .find(|s| any_phrase(s.scope(), phrases));
            eval_one(then, last, witnesses)
        }
        CompiledCondition::SizeAtLeast(mm) => max_size_in(ctx.text()).is_some_and(|size| size >= *mm),
        CompiledCondition::SizeBelow(mm) => max_size_in(ctx.text()).is_some_and(|size| size < *mm),
    }
}

fn eval_one(condition: &CompiledCondition, sentence: Option<&Sentence>, witnesses: &mut Vec<usize>) -> bool {
    match sentence {
        Some(sentence) if eval(condition, Ctx::Sentence(sentence), &mut Vec::new()) => {
            witnesses.push(sentence.index);
            true
        }
        _ => false,
    }
}

/// Sentences visible from `ctx`. Quantifiers only appear at document level.
fn sentences<'d>(ctx: Ctx<'d, '_>) -> &'d [Sentence] {
    match ctx {
        Ctx::Document(doc) => doc.sentences,
        Ctx::Sentence(_) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::{Algorithm, RuleSet, SearchConfig};
    use crate::text::{split, SearchMethod};

    fn engine(algorithm: Algorithm, search: SearchConfig) -> RuleEngine {
        let compiled = algorithm.rule_set().unwrap().compile(search).unwrap();
        RuleEngine::new(Arc::new(compiled))
    }

    fn classify(engine: &RuleEngine, text: &str) -> Outcome {
        let sentences = split(text, true);
        engine.classify(&Document::new(text, &sentences))
    }

    fn string_search() -> SearchConfig {
        SearchConfig::new(SearchMethod::String, None)
    }

    fn engine_for(algorithm: Algorithm, r6psm: SearchMethod) -> RuleEngine {
        engine(algorithm, SearchConfig::new(SearchMethod::String, Some(r6psm)))
    }

    #[test]
    fn test_negated_report_is_negative() {
        let engine = engine(Algorithm::Danforth, string_search());
        let outcome = classify(&engine, "No nodules identified.");
        assert_eq!(outcome.decision.rule(), Some(2));
        assert_eq!(outcome.decision.label(), "negative");
    }

    #[test]
    fn test_suspicious_report() {
        let engine = engine(Algorithm::Danforth, string_search());
        let outcome = classify(
            &engine,
            "Nodule measuring 2.3 cm in the right upper lobe, suspicious for malignancy.",
        );
        assert_eq!(outcome.decision.rule(), Some(4));
        assert_eq!(outcome.decision.label(), "suspicious");
        assert_eq!(outcome.witnesses, vec![0]);
    }

    #[test]
    fn test_rule_six_follows_override_method() {
        let text = "The right lower lobe nodule has increased in size.";

        let tokens = engine(
            Algorithm::Danforth,
            SearchConfig::new(SearchMethod::String, Some(SearchMethod::Tokens)),
        );
        let outcome = classify(&tokens, text);
        assert_eq!(outcome.decision.rule(), Some(6));
        assert_eq!(outcome.decision.label(), "interval_growth");

        let strings = engine(Algorithm::Danforth, string_search());
        let outcome = classify(&strings, text);
        assert_eq!(
            outcome.decision,
            Decision::NoMatch {
                label: Arc::from("indeterminate")
            }
        );
    }

    #[test]
    fn test_no_new_nodules_is_not_growth() {
        let text = "Stable 4 mm nodule in the right upper lobe. No new nodules.";
        for r6psm in [SearchMethod::String, SearchMethod::Tokens] {
            let engine = engine(
                Algorithm::Danforth,
                SearchConfig::new(SearchMethod::String, Some(r6psm)),
            );
            let outcome = classify(&engine, text);
            assert_eq!(outcome.decision.label(), "indeterminate", "r6psm={}", r6psm);

            let engine = engine_for(Algorithm::Fleischner, r6psm);
            assert_ne!(classify(&engine, text).decision.label(), "ct_3_months");
        }

        let tokens = engine_for(Algorithm::Danforth, SearchMethod::Tokens);
        assert_eq!(
            classify(&tokens, "Nodule unchanged, no interval growth.").decision.label(),
            "indeterminate"
        );
        assert_eq!(
            classify(&tokens, "There is a new nodule in the left lower lobe.").decision.label(),
            "interval_growth"
        );
    }

    #[test]
    fn test_unrelated_negation_keeps_nodule_mention() {
        let engine = engine(Algorithm::Danforth, string_search());
        let outcome = classify(
            &engine,
            "Nodule measuring 2.3 cm without calcification, suspicious for malignancy.",
        );
        assert_eq!(outcome.decision.label(), "suspicious");

        let outcome = classify(&engine, "The previously seen nodule has resolved.");
        assert_eq!(outcome.decision.label(), "negative");
        let outcome = classify(&engine, "Lungs are free of nodules. Pleura is normal.");
        assert_eq!(outcome.decision.label(), "negative");
    }

    #[test]
    fn test_no_mention_is_negative() {
        let engine = engine(Algorithm::Danforth, string_search());
        let outcome = classify(&engine, "The lungs are clear. Heart size is normal.");
        assert_eq!(outcome.decision.rule(), Some(1));
        assert!(outcome.witnesses.is_empty());
    }

    #[test]
    fn test_empty_document_takes_first_rule() {
        let engine = engine(Algorithm::Danforth, string_search());
        let outcome = classify(&engine, "");
        assert_eq!(outcome.decision.rule(), Some(1));
    }

    #[test]
    fn test_benign_and_noncalcified() {
        let engine = engine(Algorithm::Danforth, string_search());
        let benign = classify(&engine, "A 4 mm calcified granuloma nodule in the left lung.");
        assert_eq!(benign.decision.label(), "benign");

        let not_benign = classify(
            &engine,
            "A 7 mm noncalcified nodule. Recommend follow-up CT in 6 months.",
        );
        assert_eq!(not_benign.decision.label(), "follow_up");
        assert_eq!(not_benign.witnesses, vec![1]);
    }

    #[test]
    fn test_fleischner_sizes() {
        let engine = engine(Algorithm::Fleischner, string_search());
        assert_eq!(
            classify(&engine, "A 9 mm nodule in the left upper lobe.").decision.label(),
            "ct_3_months_pet_or_biopsy"
        );
        assert_eq!(
            classify(&engine, "A 9-mm nodule in the left upper lobe.").decision.label(),
            "ct_3_months_pet_or_biopsy"
        );
        assert_eq!(
            classify(&engine, "A 7 mm noncalcified nodule.").decision.label(),
            "ct_6_to_12_months"
        );
        assert_eq!(
            classify(&engine, "A 4 mm nodule in the lingula.").decision.label(),
            "no_routine_follow_up"
        );
        assert_eq!(
            classify(&engine, "There is a small nodule.").decision.label(),
            "indeterminate"
        );
    }

    #[test]
    fn test_observer_sees_short_circuit() {
        let engine = engine(Algorithm::Danforth, string_search());
        let text = "No nodules identified.";
        let sentences = split(text, true);
        let mut states = Vec::new();
        engine.classify_observed(&Document::new(text, &sentences), &mut |s| states.push(s));

        assert_eq!(
            states,
            vec![
                EngineState::Pending,
                EngineState::Evaluating(1),
                EngineState::Evaluating(2),
                EngineState::Matched(2),
            ]
        );
    }

    #[test]
    fn test_observer_sees_exhaustion() {
        let engine = engine(Algorithm::Danforth, string_search());
        let text = "There is a small nodule.";
        let sentences = split(text, true);
        let mut evaluated = 0;
        let mut last = EngineState::Pending;
        engine.classify_observed(&Document::new(text, &sentences), &mut |s| {
            if matches!(s, EngineState::Evaluating(_)) {
                evaluated += 1;
            }
            last = s;
        });
        assert_eq!(evaluated, 6);
        assert_eq!(last, EngineState::Exhausted);
    }

    #[test]
    fn test_order_decides_between_matching_rules() {
        let text = "Nodule suspicious for malignancy. Recommend follow-up CT.";
        let default = engine(Algorithm::Danforth, string_search());
        assert_eq!(classify(&default, text).decision.label(), "suspicious");

        let mut reordered = Algorithm::Danforth.rule_set().unwrap();
        reordered.reorder(&[5, 1, 2, 3, 4, 6]).unwrap();
        let engine = RuleEngine::new(Arc::new(reordered.compile(string_search()).unwrap()));
        assert_eq!(classify(&engine, text).decision.label(), "follow_up");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let engine = engine(Algorithm::Danforth, string_search());
        let text = "A 7 mm noncalcified nodule. Recommend follow-up CT in 6 months.";
        let first = classify(&engine, text);
        for _ in 0..10 {
            assert_eq!(classify(&engine, text), first);
        }
    }

    #[test]
    fn test_sentence_quantifiers() {
        let toml = r#"
            name = "quantifiers"
            [phrases]
            nodule = ["nodule"]
            clear = ["clear"]

            [[rules]]
            id = 1
            label = "all_clear"
            when = { every_sentence = { phrase = "clear" } }

            [[rules]]
            id = 2
            label = "opens_with_nodule"
            when = { first_sentence = { phrase = "nodule" } }

            [[rules]]
            id = 3
            label = "ends_with_nodule"
            when = { last_sentence = { phrase = "nodule" } }
        "#;
        let rules = RuleSet::from_toml(toml).unwrap();
        let engine = RuleEngine::new(Arc::new(rules.compile(string_search()).unwrap()));

        let outcome = classify(&engine, "Lungs clear. Pleura clear.");
        assert_eq!(outcome.decision.label(), "all_clear");
        assert_eq!(outcome.witnesses, vec![0, 1]);
        assert_eq!(classify(&engine, "Nodule seen. Pleura normal.").decision.rule(), Some(2));
        assert_eq!(classify(&engine, "Pleura normal. Nodule seen.").decision.rule(), Some(3));
        assert_eq!(classify(&engine, "Pleura normal.").decision.label(), "indeterminate");
    }
}
