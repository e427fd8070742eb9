//! Result serialization.

use crate::extract::ExtractionResult;
use crate::error::{NoduleError, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub const CSV_HEADER: &str = "File,Decision,MaxNoduleSize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = NoduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(NoduleError::Config(format!(
                "Unsupported output format '{}'. Use 'csv' or 'json'",
                s
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Quote a field when it contains a separator, a quote or a line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Millimetres without trailing zeros: `23`, `12.5`.
pub fn format_size(size: Option<f64>) -> String {
    size.map(|mm| format!("{}", mm)).unwrap_or_default()
}

pub fn write_csv<W: Write>(out: &mut W, results: &[ExtractionResult]) -> Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for result in results {
        writeln!(
            out,
            "{},{},{}",
            csv_field(&result.file),
            csv_field(&result.decision.label()),
            format_size(result.max_nodule_size)
        )?;
    }
    Ok(())
}

pub fn to_csv(results: &[ExtractionResult]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, results)?;
    String::from_utf8(buf).map_err(|e| NoduleError::Config(format!("CSV is not UTF-8: {}", e)))
}

pub fn write_json<W: Write>(out: &mut W, results: &[ExtractionResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_results<W: Write>(out: &mut W, results: &[ExtractionResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(out, results),
        OutputFormat::Json => write_json(out, results),
    }
}

/// Per-label counts for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub failed: usize,
    pub with_size: usize,
    pub largest_size: Option<f64>,
    pub by_label: BTreeMap<String, usize>,
}

pub fn summarize(results: &[ExtractionResult]) -> Summary {
    let mut summary = Summary {
        total: results.len(),
        ..Default::default()
    };

    for result in results {
        if result.decision.is_failure() {
            summary.failed += 1;
        }
        if let Some(size) = result.max_nodule_size {
            summary.with_size += 1;
            summary.largest_size = Some(summary.largest_size.map_or(size, |m| m.max(size)));
        }
        *summary.by_label.entry(result.decision.label()).or_insert(0) += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Decision, FailureKind};
    use std::sync::Arc;

    fn matched(file: &str, label: &str, size: Option<f64>) -> ExtractionResult {
        ExtractionResult {
            file: file.to_string(),
            decision: Decision::Matched {
                rule: 1,
                label: Arc::from(label),
            },
            rule: Some(1),
            max_nodule_size: size,
            error: None,
        }
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain.txt"), "plain.txt");
        assert_eq!(csv_field("a,b.txt"), "\"a,b.txt\"");
        assert_eq!(csv_field("say \"hi\".txt"), "\"say \"\"hi\"\".txt\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(Some(23.0)), "23");
        assert_eq!(format_size(Some(12.5)), "12.5");
        assert_eq!(format_size(None), "");
    }

    #[test]
    fn test_csv_output() {
        let results = vec![
            matched("a.txt", "negative", None),
            matched("b,c.txt", "suspicious", Some(23.0)),
            ExtractionResult::failed("d.txt", FailureKind::Decode, "bad bytes".to_string()),
        ];
        insta::assert_snapshot!(to_csv(&results).unwrap(), @r###"
        File,Decision,MaxNoduleSize
        a.txt,negative,
        "b,c.txt",suspicious,23
        d.txt,error:decode,
        "###);
    }

    #[test]
    fn test_json_output() {
        let results = vec![matched("a.txt", "negative", Some(4.5))];
        let mut buf = Vec::new();
        write_results(&mut buf, &results, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["file"], "a.txt");
        assert_eq!(value[0]["decision"], "negative");
        assert_eq!(value[0]["max_nodule_size"], 4.5);
        assert!(value[0].get("error").is_none());
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            matched("a.txt", "negative", None),
            matched("b.txt", "negative", Some(4.0)),
            matched("c.txt", "suspicious", Some(23.0)),
            ExtractionResult::failed("d.txt", FailureKind::Read, "gone".to_string()),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.with_size, 2);
        assert_eq!(summary.largest_size, Some(23.0));
        assert_eq!(summary.by_label["negative"], 2);
        assert_eq!(summary.by_label["error:read"], 1);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
