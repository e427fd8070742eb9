#![allow(dead_code)]

use lungnodule_lib::{
    extract_directory, BatchOptions, ExtractOptions, ExtractionResult, Extractor, MemorySink,
    Result, ScanOptions,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const NEGATIVE_REPORT: &str = "No nodules identified.";
pub const SUSPICIOUS_REPORT: &str =
    "Nodule measuring 2.3 cm in the right upper lobe, suspicious for malignancy.";
pub const GROWTH_REPORT: &str = "The right lower lobe nodule has increased in size.";

/// A temporary directory of report files.
pub struct ReportCorpus {
    pub temp_dir: TempDir,
}

impl ReportCorpus {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn report(self, name: &str, text: &str) -> Self {
        self.bytes(name, text.as_bytes())
    }

    pub fn bytes(self, name: &str, bytes: &[u8]) -> Self {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
        self
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// The three reference reports plus one file that is not valid UTF-8.
pub fn reference_corpus() -> ReportCorpus {
    ReportCorpus::new()
        .unwrap()
        .report("report1.txt", NEGATIVE_REPORT)
        .report("report2.txt", SUSPICIOUS_REPORT)
        .report("report3.txt", GROWTH_REPORT)
        .bytes("report4.txt", b"Nodule \xc3\x28 in the lingula.")
}

pub fn classify_dir(dir: &Path, options: ExtractOptions) -> Vec<ExtractionResult> {
    let extractor = Extractor::new(&options).unwrap();
    extract_directory(
        dir,
        &ScanOptions::default(),
        &extractor,
        &BatchOptions::default(),
        &MemorySink::new(),
    )
    .unwrap()
}

pub fn labels(results: &[ExtractionResult]) -> Vec<String> {
    results.iter().map(|r| r.decision.label()).collect()
}
