use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Why a document produced no classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Decode,
    Read,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Decode => "decode",
            FailureKind::Read => "read",
        }
    }
}

/// Outcome of classifying one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A rule matched.
    Matched { rule: u32, label: Arc<str> },
    /// No rule matched; the table's default label applies.
    NoMatch { label: Arc<str> },
    /// The document could not be processed.
    Failed { kind: FailureKind },
}

impl Decision {
    /// The label written to the results table.
    pub fn label(&self) -> String {
        match self {
            Decision::Matched { label, .. } | Decision::NoMatch { label } => label.to_string(),
            Decision::Failed { kind } => format!("error:{}", kind.as_str()),
        }
    }

    pub fn rule(&self) -> Option<u32> {
        match self {
            Decision::Matched { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Decision::Failed { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}
