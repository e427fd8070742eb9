//! Nodule size extraction.
//!
//! Finds `<number> <unit>` expressions, the hyphenated `5-mm` form, and
//! dimension lists such as `1.2 x 0.8 cm`. Sizes are reported in millimetres.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NoduleError, Result};
use crate::text::Sentence;
use log::Level;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:^|[^\w.])
        (?P<dims>
            (?:\d+(?:\.\d+)?|\.\d+)
            (?:\s*(?:x|by|\u{d7})\s*(?:\d+(?:\.\d+)?|\.\d+)){0,2}
        )
        \s*-?\s*
        (?P<unit>[a-z\u{b5}]+)\b",
    )
    .unwrap()
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").unwrap());

/// Which sentences the size extractor scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeScope {
    /// Every sentence of the document.
    #[default]
    Document,
    /// Only the sentences that satisfied the matched rule.
    Matched,
}

impl FromStr for SizeScope {
    type Err = NoduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(SizeScope::Document),
            "matched" => Ok(SizeScope::Matched),
            _ => Err(NoduleError::Config(format!(
                "Unknown size scope: {} (valid: document, matched)",
                s
            ))),
        }
    }
}

/// Length unit recognized in a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimetre,
    Centimetre,
}

impl LengthUnit {
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                Some(LengthUnit::Millimetre)
            }
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
                Some(LengthUnit::Centimetre)
            }
            _ => None,
        }
    }

    pub fn to_mm(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimetre => value,
            LengthUnit::Centimetre => value * 10.0,
        }
    }
}

/// Units that look like lengths but are not normalized.
fn is_unsupported_length_unit(unit: &str) -> bool {
    matches!(
        unit.to_lowercase().as_str(),
        "m" | "meter" | "meters" | "metre" | "metres" | "inch" | "inches" | "um" | "\u{b5}m"
            | "micron" | "microns"
    )
}

/// One normalized measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sentence: usize,
    pub value_mm: f64,
    pub text: String,
}

fn round_mm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// All measurements in `text`, largest dimension first within each match.
fn scan(text: &str, sentence: usize, sink: &dyn DiagnosticSink) -> Vec<Measurement> {
    let mut found = Vec::new();

    for caps in MEASUREMENT.captures_iter(text) {
        let (Some(dims), Some(unit)) = (caps.name("dims"), caps.name("unit")) else {
            continue;
        };

        let Some(length_unit) = LengthUnit::parse(unit.as_str()) else {
            if is_unsupported_length_unit(unit.as_str()) {
                sink.emit(Diagnostic::new(
                    Level::Debug,
                    DiagnosticKind::SizeParseAmbiguity,
                    format!(
                        "skipping measurement '{} {}' in sentence {}: unit cannot be normalized",
                        dims.as_str(),
                        unit.as_str(),
                        sentence
                    ),
                ));
            }
            continue;
        };

        let mut values: Vec<f64> = NUMBER
            .find_iter(dims.as_str())
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .map(|v| round_mm(length_unit.to_mm(v)))
            .filter(|v| v.is_finite())
            .collect();
        values.sort_by(|a, b| b.total_cmp(a));

        for value_mm in values {
            found.push(Measurement {
                sentence,
                value_mm,
                text: format!("{} {}", dims.as_str(), unit.as_str()),
            });
        }
    }

    found
}

/// Every measurement found in `sentences`, in sentence order.
pub fn measurements(sentences: &[Sentence], sink: &dyn DiagnosticSink) -> Vec<Measurement> {
    sentences
        .iter()
        .flat_map(|s| scan(&s.text, s.index, sink))
        .collect()
}

/// Largest measurement in `sentences`, in millimetres.
pub fn extract_max_size(sentences: &[Sentence], sink: &dyn DiagnosticSink) -> Option<f64> {
    measurements(sentences, sink)
        .into_iter()
        .map(|m| m.value_mm)
        .max_by(|a, b| a.total_cmp(b))
}

/// Largest measurement in a single piece of text, without diagnostics.
pub fn max_size_in(text: &str) -> Option<f64> {
    scan(text, 0, &crate::diagnostics::NullSink)
        .into_iter()
        .map(|m| m.value_mm)
        .max_by(|a, b| a.total_cmp(b))
}
