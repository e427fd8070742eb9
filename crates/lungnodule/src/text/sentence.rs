//! Sentence segmentation.
//!
//! Every splitter returns trimmed, ordered spans into the original text. Text
//! between consecutive spans is always whitespace, so no content is dropped.

use super::phrase::Scope;
use super::punkt::{PunktParameters, PunktSplitter};
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

/// One sentence carved out of a document.
#[derive(Debug, Clone, Serialize)]
pub struct Sentence {
    pub index: usize,
    pub span: Range<usize>,
    pub text: String,
    #[serde(skip)]
    scope: Scope,
}

impl Sentence {
    pub fn new(index: usize, span: Range<usize>, text: &str) -> Self {
        Self {
            index,
            span,
            text: text.to_string(),
            scope: Scope::new(text),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// A sentence segmentation strategy.
pub trait SentenceSplitter: Send + Sync {
    /// Byte ranges of the sentences in `text`, in order.
    fn boundaries(&self, text: &str) -> Vec<Range<usize>>;

    fn split(&self, text: &str) -> Vec<Sentence> {
        self.boundaries(text)
            .into_iter()
            .filter_map(|range| trim_span(text, range))
            .enumerate()
            .map(|(index, span)| Sentence::new(index, span.clone(), &text[span]))
            .collect()
    }
}

/// Narrows `range` to exclude surrounding whitespace; `None` if nothing is left.
pub(crate) fn trim_span(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = range.start + leading;
    Some(start..start + trimmed.len())
}

/// Heuristic splitter: terminal punctuation followed by whitespace and a
/// capital letter, or a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseSplitter;

const CLOSERS: [char; 5] = ['"', '\'', ')', ']', '\u{201d}'];

impl SentenceSplitter for BaseSplitter {
    fn boundaries(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (_, ch) = chars[i];

            if matches!(ch, '.' | '!' | '?') {
                let mut j = i + 1;
                while j < chars.len() && CLOSERS.contains(&chars[j].1) {
                    j += 1;
                }
                let mut k = j;
                while k < chars.len() && chars[k].1.is_whitespace() {
                    k += 1;
                }
                if k > j && k < chars.len() && chars[k].1.is_uppercase() {
                    let end = chars.get(j).map_or(text.len(), |&(pos, _)| pos);
                    spans.push(start..end);
                    start = end;
                    i = k;
                    continue;
                }
            } else if ch == '\n' {
                let mut k = i + 1;
                let mut newlines = 1;
                while k < chars.len() && chars[k].1.is_whitespace() {
                    if chars[k].1 == '\n' {
                        newlines += 1;
                    }
                    k += 1;
                }
                if newlines >= 2 {
                    let end = chars[i].0;
                    spans.push(start..end);
                    start = end;
                    i = k;
                    continue;
                }
            }
            i += 1;
        }

        spans.push(start..text.len());
        spans
    }
}

/// Which splitter to run, resolved once from configuration.
#[derive(Debug, Clone)]
pub enum SplitterKind {
    Base(BaseSplitter),
    Punkt(Arc<PunktSplitter>),
}

impl SplitterKind {
    pub fn base() -> Self {
        SplitterKind::Base(BaseSplitter)
    }

    pub fn punkt(params: PunktParameters) -> Self {
        SplitterKind::Punkt(Arc::new(PunktSplitter::new(params)))
    }

    /// The heuristic splitter when `use_base_splitter` is set, otherwise Punkt
    /// with the built-in English parameters.
    pub fn from_flag(use_base_splitter: bool) -> Self {
        if use_base_splitter {
            Self::base()
        } else {
            Self::punkt(PunktParameters::english())
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SplitterKind::Base(_) => "base",
            SplitterKind::Punkt(_) => "punkt",
        }
    }

    pub fn split(&self, text: &str) -> Vec<Sentence> {
        match self {
            SplitterKind::Base(splitter) => splitter.split(text),
            SplitterKind::Punkt(splitter) => splitter.split(text),
        }
    }
}

impl Default for SplitterKind {
    fn default() -> Self {
        Self::from_flag(false)
    }
}

/// Splits `text` with the heuristic or the statistical splitter.
pub fn split(text: &str, use_base_splitter: bool) -> Vec<Sentence> {
    SplitterKind::from_flag(use_base_splitter).split(text)
}
