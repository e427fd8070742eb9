//! Rule tables for report classification.
//!
//! A rule table is plain data: named phrase sets plus an ordered list of
//! rules, each a boolean condition over the document's sentences. Tables are
//! loaded from TOML, validated, and compiled against a phrase search
//! configuration before any document is processed.
//!
//! Conditions are evaluated against a scope: the whole document at the top
//! level, or a single sentence inside a sentence quantifier
//! (`any_sentence`, `every_sentence`, `first_sentence`, `last_sentence`,
//! `last_sentence_with`).

use crate::error::{NoduleError, Result};
use crate::text::{Phrase, SearchMethod};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// The rule whose phrase search method may differ from the global one.
pub const OVERRIDE_RULE_ID: u32 = 6;

fn default_label() -> String {
    "indeterminate".to_string()
}

/// A boolean condition in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Any phrase of the named set is present in the current scope.
    Phrase(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    AnySentence(Box<Condition>),
    /// Holds for every sentence (vacuously true for an empty document).
    EverySentence(Box<Condition>),
    FirstSentence(Box<Condition>),
    LastSentence(Box<Condition>),
    /// The last sentence containing `phrase` satisfies `then`.
    LastSentenceWith {
        phrase: String,
        then: Box<Condition>,
    },
    /// Largest measurement in scope is at least this many millimetres.
    SizeAtLeast(f64),
    /// A measurement is present in scope and the largest is below this many millimetres.
    SizeBelow(f64),
}

impl Condition {
    fn is_sentence_quantifier(&self) -> bool {
        matches!(
            self,
            Condition::AnySentence(_)
                | Condition::EverySentence(_)
                | Condition::FirstSentence(_)
                | Condition::LastSentence(_)
                | Condition::LastSentenceWith { .. }
        )
    }
}

/// One rule of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    pub id: u32,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Evaluate this rule with the rule 6 search method.
    #[serde(default)]
    pub override_search: bool,
    pub when: Condition,
}

/// A complete, ordered rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default)]
    pub phrases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

impl RuleSet {
    /// Load rules from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NoduleError::Config(format!("Failed to read rules {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse rules from a TOML string and validate them.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let rules: RuleSet = toml::from_str(toml_str)
            .map_err(|e| NoduleError::Config(format!("Failed to parse rules TOML: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NoduleError::Config(format!("Failed to serialize rules: {}", e)))
    }

    pub fn rule_ids(&self) -> Vec<u32> {
        self.rules.iter().map(|r| r.id).collect()
    }

    /// Put the rules in the given order. `order` must name every rule once.
    pub fn reorder(&mut self, order: &[u32]) -> Result<()> {
        let mut current: HashSet<u32> = self.rule_ids().into_iter().collect();
        if order.len() != self.rules.len() || !order.iter().all(|id| current.remove(id)) {
            return Err(NoduleError::Config(format!(
                "Rule order {:?} is not a permutation of {:?}",
                order,
                self.rule_ids()
            )));
        }

        let mut by_id: HashMap<u32, RuleDef> =
            self.rules.drain(..).map(|rule| (rule.id, rule)).collect();
        for id in order {
            if let Some(rule) = by_id.remove(id) {
                self.rules.push(rule);
            }
        }
        Ok(())
    }

    /// Check the table for structural errors.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(NoduleError::Config(format!("Rule table '{}' has no rules", self.name)));
        }
        if self.default_label.trim().is_empty() {
            return Err(NoduleError::Config("default_label cannot be empty".to_string()));
        }

        for (name, phrases) in &self.phrases {
            if phrases.is_empty() {
                return Err(NoduleError::Config(format!("Phrase set '{}' is empty", name)));
            }
            if let Some(bad) = phrases
                .iter()
                .find(|p| Phrase::new(p, SearchMethod::Tokens).is_empty())
            {
                return Err(NoduleError::Config(format!(
                    "Phrase set '{}' contains an empty phrase: {:?}",
                    name, bad
                )));
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id) {
                return Err(NoduleError::InvalidRule {
                    rule: rule.id,
                    reason: "duplicate rule id".to_string(),
                });
            }
            if rule.label.trim().is_empty() {
                return Err(invalid(rule.id, "label cannot be empty"));
            }
            if rule.override_search && rule.id != OVERRIDE_RULE_ID {
                return Err(invalid(
                    rule.id,
                    &format!("only rule {} may override the search method", OVERRIDE_RULE_ID),
                ));
            }
            self.validate_condition(rule.id, &rule.when, false)?;
        }

        Ok(())
    }

    fn validate_condition(&self, rule: u32, condition: &Condition, in_sentence: bool) -> Result<()> {
        if in_sentence && condition.is_sentence_quantifier() {
            return Err(invalid(rule, "sentence quantifiers cannot be nested"));
        }

        match condition {
            Condition::Phrase(name) => self.check_phrase(rule, name),
            Condition::All(items) | Condition::Any(items) => {
                if items.is_empty() {
                    return Err(invalid(rule, "all/any needs at least one condition"));
                }
                items
                    .iter()
                    .try_for_each(|c| self.validate_condition(rule, c, in_sentence))
            }
            Condition::Not(inner) => self.validate_condition(rule, inner, in_sentence),
            Condition::AnySentence(inner)
            | Condition::EverySentence(inner)
            | Condition::FirstSentence(inner)
            | Condition::LastSentence(inner) => self.validate_condition(rule, inner, true),
            Condition::LastSentenceWith { phrase, then } => {
                self.check_phrase(rule, phrase)?;
                self.validate_condition(rule, then, true)
            }
            Condition::SizeAtLeast(mm) | Condition::SizeBelow(mm) => {
                if !mm.is_finite() || *mm < 0.0 {
                    return Err(invalid(rule, &format!("invalid size threshold {}", mm)));
                }
                Ok(())
            }
        }
    }

    fn check_phrase(&self, rule: u32, name: &str) -> Result<()> {
        if self.phrases.contains_key(name) {
            Ok(())
        } else {
            Err(invalid(rule, &format!("unknown phrase set '{}'", name)))
        }
    }

    /// Validate and compile against a search configuration.
    pub fn compile(&self, search: SearchConfig) -> Result<CompiledRules> {
        self.validate()?;

        let mut compiler = Compiler {
            sets: &self.phrases,
            cache: HashMap::new(),
        };
        let rules = self
            .rules
            .iter()
            .map(|rule| {
                let method = if rule.override_search {
                    search.rule6_method()
                } else {
                    search.psm
                };
                Ok(CompiledRule {
                    id: rule.id,
                    label: Arc::from(rule.label.as_str()),
                    method,
                    when: compiler.compile(&rule.when, method)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledRules {
            name: self.name.clone(),
            default_label: Arc::from(self.default_label.as_str()),
            search,
            rules,
        })
    }
}

fn invalid(rule: u32, reason: &str) -> NoduleError {
    NoduleError::InvalidRule {
        rule,
        reason: reason.to_string(),
    }
}

/// Global phrase search method plus the rule 6 override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchConfig {
    pub psm: SearchMethod,
    pub r6psm: Option<SearchMethod>,
}

impl SearchConfig {
    pub fn new(psm: SearchMethod, r6psm: Option<SearchMethod>) -> Self {
        Self { psm, r6psm }
    }

    /// Method for the override rule; falls back to `psm`.
    pub fn rule6_method(&self) -> SearchMethod {
        self.r6psm.unwrap_or(self.psm)
    }
}

/// A condition with its phrase sets resolved.
#[derive(Debug, Clone)]
pub enum CompiledCondition {
    Phrases(Arc<[Phrase]>),
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
    AnySentence(Box<CompiledCondition>),
    EverySentence(Box<CompiledCondition>),
    FirstSentence(Box<CompiledCondition>),
    LastSentence(Box<CompiledCondition>),
    LastSentenceWith {
        phrases: Arc<[Phrase]>,
        then: Box<CompiledCondition>,
    },
    SizeAtLeast(f64),
    SizeBelow(f64),
}

struct Compiler<'a> {
    sets: &'a BTreeMap<String, Vec<String>>,
    cache: HashMap<(String, SearchMethod), Arc<[Phrase]>>,
}

impl Compiler<'_> {
    fn phrases(&mut self, name: &str, method: SearchMethod) -> Result<Arc<[Phrase]>> {
        if let Some(phrases) = self.cache.get(&(name.to_string(), method)) {
            return Ok(Arc::clone(phrases));
        }
        let texts = self
            .sets
            .get(name)
            .ok_or_else(|| NoduleError::Config(format!("Unknown phrase set '{}'", name)))?;
        let phrases: Arc<[Phrase]> = texts.iter().map(|t| Phrase::new(t, method)).collect();
        self.cache.insert((name.to_string(), method), Arc::clone(&phrases));
        Ok(phrases)
    }

    fn compile(&mut self, condition: &Condition, method: SearchMethod) -> Result<CompiledCondition> {
        Ok(match condition {
            Condition::Phrase(name) => CompiledCondition::Phrases(self.phrases(name, method)?),
            Condition::All(items) => CompiledCondition::All(
                items
                    .iter()
                    .map(|c| self.compile(c, method))
                    .collect::<Result<_>>()?,
            ),
            Condition::Any(items) => CompiledCondition::Any(
                items
                    .iter()
                    .map(|c| self.compile(c, method))
                    .collect::<Result<_>>()?,
            ),
            Condition::Not(inner) => CompiledCondition::Not(Box::new(self.compile(inner, method)?)),
            Condition::AnySentence(inner) => {
                CompiledCondition::AnySentence(Box::new(self.compile(inner, method)?))
            }
            Condition::EverySentence(inner) => {
                CompiledCondition::EverySentence(Box::new(self.compile(inner, method)?))
            }
            Condition::FirstSentence(inner) => {
                CompiledCondition::FirstSentence(Box::new(self.compile(inner, method)?))
            }
            Condition::LastSentence(inner) => {
                CompiledCondition::LastSentence(Box::new(self.compile(inner, method)?))
            }
            Condition::LastSentenceWith { phrase, then } => CompiledCondition::LastSentenceWith {
                phrases: self.phrases(phrase, method)?,
                then: Box::new(self.compile(then, method)?),
            },
            Condition::SizeAtLeast(mm) => CompiledCondition::SizeAtLeast(*mm),
            Condition::SizeBelow(mm) => CompiledCondition::SizeBelow(*mm),
        })
    }
}

/// A rule bound to its search method.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: u32,
    pub label: Arc<str>,
    pub method: SearchMethod,
    pub when: CompiledCondition,
}

/// An immutable, ready-to-evaluate rule table.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub name: String,
    pub default_label: Arc<str>,
    pub search: SearchConfig,
    pub rules: Vec<CompiledRule>,
}

/// Built-in rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Danforth,
    Fleischner,
}

const DANFORTH_RULES: &str = include_str!("../../rules/danforth.toml");
const FLEISCHNER_RULES: &str = include_str!("../../rules/fleischner.toml");

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Danforth, Algorithm::Fleischner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Danforth => "danforth",
            Algorithm::Fleischner => "fleischner",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Algorithm::Danforth => DANFORTH_RULES,
            Algorithm::Fleischner => FLEISCHNER_RULES,
        }
    }

    pub fn rule_set(&self) -> Result<RuleSet> {
        RuleSet::from_toml(self.source())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = NoduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "danforth" => Ok(Algorithm::Danforth),
            "fleischner" => Ok(Algorithm::Fleischner),
            _ => Err(NoduleError::UnknownAlgorithm(s.to_string())),
        }
    }
}
