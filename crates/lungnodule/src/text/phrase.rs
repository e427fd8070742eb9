//! Phrase search under the STRING and TOKENS strategies.

use super::tokenize::{normalize, token_set, tokenize};
use crate::error::NoduleError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Strategy used to decide whether a phrase is present in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Case-insensitive substring of the whitespace-collapsed text.
    #[default]
    String,
    /// Every phrase token appears in the scope's token set.
    Tokens,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::String => "string",
            SearchMethod::Tokens => "tokens",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = NoduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(SearchMethod::String),
            "tokens" => Ok(SearchMethod::Tokens),
            _ => Err(NoduleError::UnknownSearchMethod(s.to_string())),
        }
    }
}

/// An immutable search pattern bound to its strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    text: String,
    method: SearchMethod,
    normalized: String,
    tokens: Vec<String>,
}

impl Phrase {
    pub fn new(text: &str, method: SearchMethod) -> Self {
        let mut tokens = tokenize(text);
        tokens.sort();
        tokens.dedup();
        Self {
            text: text.to_string(),
            method,
            normalized: normalize(text),
            tokens,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        match self.method {
            SearchMethod::String => self.normalized.is_empty(),
            SearchMethod::Tokens => self.tokens.is_empty(),
        }
    }
}

/// Matching view of a sentence or a whole document.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    normalized: String,
    tokens: HashSet<String>,
}

impl Scope {
    pub fn new(text: &str) -> Self {
        Self {
            normalized: normalize(text),
            tokens: token_set(text),
        }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn tokens(&self) -> &HashSet<String> {
        &self.tokens
    }
}

/// Decides whether `phrase` is present in `scope`. An empty phrase matches.
pub fn matches(scope: &Scope, phrase: &Phrase) -> bool {
    match phrase.method {
        SearchMethod::String => scope.normalized.contains(phrase.normalized.as_str()),
        SearchMethod::Tokens => phrase.tokens.iter().all(|t| scope.tokens.contains(t)),
    }
}
