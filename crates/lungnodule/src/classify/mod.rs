pub mod decision;
pub mod engine;
pub mod rules;

pub use decision::{Decision, FailureKind};
pub use engine::{Document, EngineState, Outcome, RuleEngine};
pub use rules::{
    Algorithm, CompiledRules, Condition, RuleDef, RuleSet, SearchConfig, OVERRIDE_RULE_ID,
};
