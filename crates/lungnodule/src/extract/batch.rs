use super::orchestrator::{ExtractionResult, Extractor};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NoduleError, Result};
use crate::index::{scan_directory, InputFile, ScanOptions};
use indicatif::ProgressBar;
use log::Level;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What to do with files that cannot be decoded or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Keep a row with an `error:<kind>` decision.
    #[default]
    Report,
    /// Leave the file out of the results.
    Skip,
}

impl FromStr for DecodeErrorPolicy {
    type Err = NoduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(DecodeErrorPolicy::Report),
            "skip" => Ok(DecodeErrorPolicy::Skip),
            _ => Err(NoduleError::Config(format!(
                "Unknown decode error policy: {} (valid: report, skip)",
                s
            ))),
        }
    }
}

impl fmt::Display for DecodeErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorPolicy::Report => f.write_str("report"),
            DecodeErrorPolicy::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Worker threads; 0 or 1 runs on the calling thread.
    pub jobs: usize,
    pub on_decode_error: DecodeErrorPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            on_decode_error: DecodeErrorPolicy::Report,
        }
    }
}

/// Process `files` and return their results in the same order.
///
/// A failure on one file never stops the batch. With `jobs > 1` the files are
/// spread over a dedicated rayon pool.
pub fn run_batch(
    extractor: &Extractor,
    files: &[InputFile],
    options: &BatchOptions,
    sink: &dyn DiagnosticSink,
    progress: Option<&ProgressBar>,
) -> Result<Vec<ExtractionResult>> {
    let process = |input: &InputFile| {
        let result = extractor.process_file(input, sink);
        if let Some(pb) = progress {
            pb.inc(1);
        }
        result
    };

    let results: Vec<ExtractionResult> = if options.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| NoduleError::Config(format!("Failed to start worker pool: {}", e)))?;
        pool.install(|| files.par_iter().map(process).collect::<Vec<_>>())
    } else {
        files.iter().map(process).collect()
    };

    let failed = results.iter().filter(|r| r.decision.is_failure()).count();
    sink.emit(Diagnostic::new(
        Level::Info,
        DiagnosticKind::Batch,
        format!(
            "processed {} files ({} failed, jobs={})",
            results.len(),
            failed,
            options.jobs.max(1)
        ),
    ));

    Ok(match options.on_decode_error {
        DecodeErrorPolicy::Report => results,
        DecodeErrorPolicy::Skip => results
            .into_iter()
            .filter(|r| !r.decision.is_failure())
            .collect(),
    })
}

/// Enumerate `dir` and classify every file found.
pub fn extract_directory<P: AsRef<Path>>(
    dir: P,
    scan: &ScanOptions,
    extractor: &Extractor,
    options: &BatchOptions,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ExtractionResult>> {
    let (files, _) = scan_directory(dir, scan, sink)?;
    run_batch(extractor, &files, options, sink, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::extract::ExtractOptions;
    use std::fs;
    use tempfile::TempDir;

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("01.txt"), "No nodules identified.").unwrap();
        fs::write(dir.path().join("02.txt"), b"Nodule \xff\xfe seen.").unwrap();
        fs::write(
            dir.path().join("03.txt"),
            "Nodule measuring 2.3 cm in the right upper lobe, suspicious for malignancy.",
        )
        .unwrap();
        dir
    }

    fn labels(results: &[ExtractionResult]) -> Vec<(String, String)> {
        results
            .iter()
            .map(|r| (r.file.clone(), r.decision.label()))
            .collect()
    }

    #[test]
    fn test_decode_error_reported_and_batch_continues() {
        let dir = corpus();
        let extractor = Extractor::new(&ExtractOptions::default()).unwrap();
        let sink = MemorySink::new();
        let results = extract_directory(
            dir.path(),
            &ScanOptions::default(),
            &extractor,
            &BatchOptions::default(),
            &sink,
        )
        .unwrap();

        assert_eq!(
            labels(&results),
            vec![
                ("01.txt".to_string(), "negative".to_string()),
                ("02.txt".to_string(), "error:decode".to_string()),
                ("03.txt".to_string(), "suspicious".to_string()),
            ]
        );
        assert_eq!(sink.count(DiagnosticKind::Decode), 1);
        assert_eq!(sink.count(DiagnosticKind::Batch), 1);
    }

    #[test]
    fn test_skip_policy_drops_failed_rows() {
        let dir = corpus();
        let extractor = Extractor::new(&ExtractOptions::default()).unwrap();
        let options = BatchOptions {
            on_decode_error: DecodeErrorPolicy::Skip,
            ..Default::default()
        };
        let results =
            extract_directory(dir.path(), &ScanOptions::default(), &extractor, &options, &MemorySink::new())
                .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.decision.is_failure()));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let texts = [
            "No nodules identified.",
            "A 9 mm nodule. Recommend follow-up CT.",
            "The lungs are clear.",
            "Calcified granuloma nodule.",
            "There is a small nodule.",
        ];
        for i in 0..40 {
            fs::write(dir.path().join(format!("{:03}.txt", i)), texts[i % texts.len()]).unwrap();
        }

        let extractor = Extractor::new(&ExtractOptions {
            extract_size: true,
            ..Default::default()
        })
        .unwrap();
        let (files, _) = scan_directory(dir.path(), &ScanOptions::default(), &MemorySink::new()).unwrap();

        let sequential = run_batch(&extractor, &files, &BatchOptions::default(), &MemorySink::new(), None).unwrap();
        let parallel = run_batch(
            &extractor,
            &files,
            &BatchOptions {
                jobs: 4,
                ..Default::default()
            },
            &MemorySink::new(),
            None,
        )
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 40);
        assert_eq!(parallel[0].file, "000.txt");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("SKIP".parse::<DecodeErrorPolicy>().unwrap(), DecodeErrorPolicy::Skip);
        assert!("ignore".parse::<DecodeErrorPolicy>().is_err());
    }
}
