//! Punkt-style statistical sentence boundary detection.
//!
//! Boundaries are decided from learned parameters: abbreviation types,
//! collocations, frequent sentence starters, and the orthographic context in
//! which each word type has been seen. `PunktTrainer` learns these
//! parameters from raw text without supervision, following Kiss & Strunk
//! (2006).

use super::sentence::SentenceSplitter;
use crate::error::{NoduleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;

const ORTHO_BEG_UC: u8 = 1 << 1;
const ORTHO_MID_UC: u8 = 1 << 2;
const ORTHO_UNK_UC: u8 = 1 << 3;
const ORTHO_BEG_LC: u8 = 1 << 4;
const ORTHO_MID_LC: u8 = 1 << 5;
const ORTHO_UNK_LC: u8 = 1 << 6;
const ORTHO_UC: u8 = ORTHO_BEG_UC | ORTHO_MID_UC | ORTHO_UNK_UC;
const ORTHO_LC: u8 = ORTHO_BEG_LC | ORTHO_MID_LC | ORTHO_UNK_LC;

const ABBREV_THRESHOLD: f64 = 0.3;
const SENT_STARTER_THRESHOLD: f64 = 30.0;
const NUMBER_TYPE: &str = "##number##";

const CLOSERS: &[char] = &['"', '\'', ')', ']', '\u{201d}', '\u{2019}'];

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "approx", "ant", "apt", "bilat", "cf", "cont", "dept", "dr", "dx", "e.g", "est", "etc",
    "fig", "figs", "hx", "i.e", "inf", "incl", "jr", "lat", "mr", "mrs", "ms", "post", "prof",
    "pt", "pts", "s/p", "sr", "st", "sup", "sx", "tx", "vs", "w/o",
];

const ENGLISH_SENT_STARTERS: &[&str] = &[
    "a", "additionally", "again", "also", "an", "comparison", "findings", "heart", "history",
    "however", "impression", "indication", "it", "lungs", "new", "no", "otherwise", "recommend",
    "stable", "technique", "the", "there", "these", "this", "unchanged",
];

/// Learned Punkt parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PunktParameters {
    #[serde(default)]
    pub abbrev_types: BTreeSet<String>,
    #[serde(default)]
    pub collocations: BTreeSet<(String, String)>,
    #[serde(default)]
    pub sent_starters: BTreeSet<String>,
    #[serde(default)]
    pub ortho_context: BTreeMap<String, u8>,
}

impl PunktParameters {
    /// Built-in parameters for English radiology prose.
    ///
    /// Unit abbreviations such as `cm` and `mm` are not abbreviation types: in
    /// reports they usually end a sentence.
    pub fn english() -> Self {
        Self {
            abbrev_types: ENGLISH_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
            collocations: BTreeSet::new(),
            sent_starters: ENGLISH_SENT_STARTERS.iter().map(|s| s.to_string()).collect(),
            ortho_context: BTreeMap::new(),
        }
    }

    /// Load parameters from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NoduleError::Config(format!("Failed to read splitter model {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| NoduleError::Config(format!("Failed to parse splitter model: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| NoduleError::Config(format!("Failed to serialize splitter model: {}", e)))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Union of both parameter sets; orthographic flags are or-ed together.
    pub fn merge(mut self, other: PunktParameters) -> Self {
        self.abbrev_types.extend(other.abbrev_types);
        self.collocations.extend(other.collocations);
        self.sent_starters.extend(other.sent_starters);
        for (word, flags) in other.ortho_context {
            *self.ortho_context.entry(word).or_insert(0) |= flags;
        }
        self
    }

    fn ortho(&self, typ: &str) -> u8 {
        self.ortho_context.get(typ).copied().unwrap_or(0)
    }
}

/// A whitespace-delimited token with its annotations.
#[derive(Debug, Clone)]
struct Token {
    span: Range<usize>,
    /// Lower-cased type without a final period; numbers collapse to one type.
    typ: String,
    period_final: bool,
    first_upper: bool,
    first_lower: bool,
    is_alpha: bool,
    ends_question: bool,
    ellipsis: bool,
    paragraph_after: bool,
    sentbreak: bool,
    abbr: bool,
}

impl Token {
    fn is_initial(&self) -> bool {
        let mut chars = self.typ.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
    }

    fn type_with_period(&self) -> String {
        if self.period_final {
            format!("{}.", self.typ)
        } else {
            self.typ.clone()
        }
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut start: Option<usize> = None;

    let push = |tokens: &mut Vec<Token>, range: Range<usize>| {
        tokens.push(make_token(text, range));
    };

    for (pos, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                push(&mut tokens, s..pos);
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
    }
    if let Some(s) = start {
        push(&mut tokens, s..text.len());
    }

    for i in 1..tokens.len() {
        let gap = &text[tokens[i - 1].span.end..tokens[i].span.start];
        tokens[i - 1].paragraph_after = gap.matches('\n').count() >= 2;
    }

    tokens
}

fn make_token(text: &str, span: Range<usize>) -> Token {
    let raw = &text[span.clone()];
    let core = raw.trim_end_matches(CLOSERS);
    let period_final = core.ends_with('.') || core.ends_with('\u{2026}');
    let ellipsis = core.ends_with("..") || core.ends_with('\u{2026}');
    let ends_question = core.ends_with('?') || core.ends_with('!');

    let body = core
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| c == '.' || c == '\u{2026}');
    let lowered = body.to_lowercase();
    let is_number = !lowered.is_empty()
        && lowered.chars().any(|c| c.is_ascii_digit())
        && lowered.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'));
    let typ = if is_number { NUMBER_TYPE.to_string() } else { lowered };

    let first_alpha = body.chars().next().filter(|c| c.is_alphabetic());

    Token {
        span,
        is_alpha: body.chars().any(char::is_alphabetic),
        typ,
        period_final,
        first_upper: first_alpha.is_some_and(char::is_uppercase),
        first_lower: first_alpha.is_some_and(char::is_lowercase),
        ends_question,
        ellipsis,
        paragraph_after: false,
        sentbreak: false,
        abbr: false,
    }
}

fn is_abbreviation(params: &PunktParameters, extra: &HashSet<String>, token: &Token) -> bool {
    if token.typ == NUMBER_TYPE {
        return false;
    }
    if params.abbrev_types.contains(&token.typ) || extra.contains(&token.typ) || token.is_initial() {
        return true;
    }
    // Dotted initialisms such as "u.s"
    token.typ.contains('.')
        && token
            .typ
            .split('.')
            .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic))
}

fn annotate_first_pass(tokens: &mut [Token], params: &PunktParameters, extra: &HashSet<String>) {
    for token in tokens.iter_mut() {
        if token.ends_question {
            token.sentbreak = true;
        } else if token.ellipsis {
            // Decided in the second pass
        } else if token.period_final {
            if is_abbreviation(params, extra, token) {
                token.abbr = true;
            } else {
                token.sentbreak = true;
            }
        }
        if token.paragraph_after {
            token.sentbreak = true;
        }
    }
}

/// `Some(true)` if `next` looks like a sentence start, `Some(false)` if it
/// looks sentence-internal, `None` if unknown.
fn ortho_heuristic(params: &PunktParameters, next: &Token) -> Option<bool> {
    if !next.is_alpha && next.typ.chars().all(|c| ";:,.!?".contains(c)) {
        return Some(false);
    }
    let context = params.ortho(&next.typ);
    if next.first_upper && context & ORTHO_LC != 0 && context & ORTHO_MID_UC == 0 {
        return Some(true);
    }
    if next.first_lower && (context & ORTHO_UC != 0 || context & ORTHO_BEG_LC == 0) {
        return Some(false);
    }
    None
}

fn annotate_second_pass(tokens: &mut [Token], params: &PunktParameters) {
    for i in 0..tokens.len().saturating_sub(1) {
        let (head, tail) = tokens.split_at_mut(i + 1);
        let token = &mut head[i];
        let next = &tail[0];

        if token.paragraph_after || token.ends_question {
            continue;
        }

        if token.abbr || token.ellipsis {
            let starter = next.first_upper && params.sent_starters.contains(&next.typ);
            if ortho_heuristic(params, next) == Some(true) || starter {
                token.sentbreak = true;
            }
            continue;
        }

        if token.sentbreak && token.period_final {
            let collocation = params
                .collocations
                .contains(&(token.typ.clone(), next.typ.clone()));
            if collocation || (next.first_lower && ortho_heuristic(params, next) == Some(false)) {
                token.sentbreak = false;
                token.abbr = collocation;
            }
        }
    }
}

/// Statistical sentence splitter driven by `PunktParameters`.
#[derive(Debug, Clone)]
pub struct PunktSplitter {
    params: PunktParameters,
}

impl PunktSplitter {
    pub fn new(params: PunktParameters) -> Self {
        Self { params }
    }
}

impl Default for PunktSplitter {
    fn default() -> Self {
        Self::new(PunktParameters::english())
    }
}

impl SentenceSplitter for PunktSplitter {
    fn boundaries(&self, text: &str) -> Vec<Range<usize>> {
        let mut tokens = tokenize(text);
        annotate_first_pass(&mut tokens, &self.params, &HashSet::new());
        annotate_second_pass(&mut tokens, &self.params);

        let mut spans = Vec::new();
        let mut start = 0;
        for token in &tokens {
            if token.sentbreak {
                spans.push(start..token.span.end);
                start = token.span.end;
            }
        }
        spans.push(start..text.len());
        spans
    }
}

fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

/// Likelihood ratio that a type is followed by a period more often than
/// chance, as used for abbreviation detection.
fn dunning_log_likelihood(count_a: f64, count_b: f64, count_ab: f64, n: f64) -> f64 {
    let p1 = count_b / n;
    let p2 = 0.99;
    let null_hypo = xlogy(count_ab, p1) + xlogy(count_a - count_ab, 1.0 - p1);
    let alt_hypo = xlogy(count_ab, p2) + xlogy(count_a - count_ab, 1.0 - p2);
    -2.0 * (null_hypo - alt_hypo)
}

/// Collocation log-likelihood between two events.
fn col_log_likelihood(count_a: f64, count_b: f64, count_ab: f64, n: f64) -> f64 {
    let p = count_b / n;
    let p1 = count_ab / count_a;
    let p2 = (count_b - count_ab) / (n - count_a);

    let summand1 = xlogy(count_ab, p) + xlogy(count_a - count_ab, 1.0 - p);
    let summand2 = xlogy(count_b - count_ab, p) + xlogy(n - count_a - count_b + count_ab, 1.0 - p);
    let summand3 = if count_a == count_ab {
        0.0
    } else {
        xlogy(count_ab, p1) + xlogy(count_a - count_ab, 1.0 - p1)
    };
    let summand4 = if count_b == count_ab {
        0.0
    } else {
        xlogy(count_b - count_ab, p2) + xlogy(n - count_a - count_b + count_ab, 1.0 - p2)
    };

    -2.0 * (summand1 + summand2 - summand3 - summand4)
}

/// Learns `PunktParameters` from raw text.
#[derive(Debug, Default)]
pub struct PunktTrainer {
    tokens: Vec<Token>,
}

impl PunktTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the training corpus.
    pub fn train(&mut self, text: &str) {
        let mut tokens = tokenize(text);
        if let Some(last) = tokens.last_mut() {
            last.paragraph_after = true;
        }
        self.tokens.extend(tokens);
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compute parameters from everything seen so far, merged into `base`.
    pub fn finalize(mut self, base: PunktParameters) -> PunktParameters {
        let abbrev_types = self.find_abbrev_types();
        annotate_first_pass(&mut self.tokens, &base, &abbrev_types);

        let mut learned = PunktParameters {
            abbrev_types: abbrev_types.into_iter().collect(),
            ..PunktParameters::default()
        };
        learned.ortho_context = self.ortho_context();
        learned.sent_starters = self.find_sent_starters();

        base.merge(learned)
    }

    fn find_abbrev_types(&self) -> HashSet<String> {
        let mut type_counts: HashMap<String, usize> = HashMap::new();
        let mut period_tokens = 0usize;
        for token in &self.tokens {
            *type_counts.entry(token.type_with_period()).or_insert(0) += 1;
            if token.period_final {
                period_tokens += 1;
            }
        }

        let n = self.tokens.len() as f64;
        let mut found = HashSet::new();
        if period_tokens == 0 {
            return found;
        }

        let candidates: BTreeSet<&str> = self
            .tokens
            .iter()
            .filter(|t| t.period_final && !t.ellipsis && t.is_alpha && t.typ != NUMBER_TYPE)
            .map(|t| t.typ.as_str())
            .collect();

        for typ in candidates {
            let with_period = type_counts.get(&format!("{}.", typ)).copied().unwrap_or(0) as f64;
            let without_period = type_counts.get(typ).copied().unwrap_or(0) as f64;

            let num_periods = (typ.matches('.').count() + 1) as f64;
            let num_nonperiods = (typ.chars().count() - typ.matches('.').count()) as f64;

            let ll = dunning_log_likelihood(
                with_period + without_period,
                period_tokens as f64,
                with_period,
                n,
            );
            let f_length = (-num_nonperiods).exp();
            let f_penalty = num_nonperiods.powf(-without_period);
            let score = ll * f_length * num_periods * f_penalty;

            if score.is_finite() && score >= ABBREV_THRESHOLD {
                found.insert(typ.to_string());
            }
        }

        found
    }

    fn ortho_context(&self) -> BTreeMap<String, u8> {
        #[derive(Clone, Copy, PartialEq)]
        enum Context {
            Initial,
            Internal,
            Unknown,
        }

        let mut ortho: BTreeMap<String, u8> = BTreeMap::new();
        let mut context = Context::Initial;

        for token in &self.tokens {
            let flag = match (context, token.first_upper, token.first_lower) {
                (Context::Initial, true, _) => ORTHO_BEG_UC,
                (Context::Internal, true, _) => ORTHO_MID_UC,
                (Context::Unknown, true, _) => ORTHO_UNK_UC,
                (Context::Initial, _, true) => ORTHO_BEG_LC,
                (Context::Internal, _, true) => ORTHO_MID_LC,
                (Context::Unknown, _, true) => ORTHO_UNK_LC,
                _ => 0,
            };
            if flag != 0 {
                *ortho.entry(token.typ.clone()).or_insert(0) |= flag;
            }

            context = if token.sentbreak {
                if token.typ == NUMBER_TYPE || token.is_initial() {
                    Context::Unknown
                } else {
                    Context::Initial
                }
            } else if token.ellipsis || token.abbr {
                Context::Unknown
            } else {
                Context::Internal
            };
        }

        ortho
    }

    fn find_sent_starters(&self) -> BTreeSet<String> {
        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        let mut after_break: HashMap<&str, usize> = HashMap::new();
        let mut sentbreaks = 0usize;

        for pair in self.tokens.windows(2) {
            if pair[0].sentbreak {
                sentbreaks += 1;
                if pair[1].is_alpha && pair[1].typ != NUMBER_TYPE {
                    *after_break.entry(pair[1].typ.as_str()).or_insert(0) += 1;
                }
            }
        }
        for token in &self.tokens {
            *type_counts.entry(token.typ.as_str()).or_insert(0) += 1;
        }

        let n = self.tokens.len() as f64;
        let mut starters = BTreeSet::new();
        if sentbreaks == 0 {
            return starters;
        }

        for (typ, at_break) in after_break {
            let total = type_counts.get(typ).copied().unwrap_or(0) as f64;
            let at_break = at_break as f64;
            let ll = col_log_likelihood(sentbreaks as f64, total, at_break, n);
            if ll.is_finite()
                && ll >= SENT_STARTER_THRESHOLD
                && n / sentbreaks as f64 > total / at_break
            {
                starters.insert(typ.to_string());
            }
        }

        starters
    }
}
