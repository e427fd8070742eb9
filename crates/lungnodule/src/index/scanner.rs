use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{NoduleError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::Level;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub files_found: usize,
    pub dirs_scanned: usize,
    pub hidden_skipped: usize,
    pub filtered_out: usize,
    pub errors: usize,
}

/// Options for input enumeration
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
    /// Glob patterns matched against the file's relative path. Empty means all files.
    pub include: Vec<String>,
}

/// One document to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// Path relative to the input directory, `/`-separated. Used as the CSV `File` column.
    pub name: String,
}

fn build_include_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| NoduleError::Config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| NoduleError::Config(format!("Failed to build globset: {}", e)))?;
    Ok(Some(set))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Lists the documents under `path` in sorted name order.
///
/// Only the top level is read unless `options.recursive` is set. Hidden
/// files and directories are skipped unless `options.include_hidden` is set.
/// Entries that cannot be read are reported to `sink` and counted as errors.
pub fn scan_directory<P: AsRef<Path>>(
    path: P,
    options: &ScanOptions,
    sink: &dyn DiagnosticSink,
) -> Result<(Vec<InputFile>, ScanStats)> {
    let path = path.as_ref();
    let mut stats = ScanStats::default();

    if !path.is_dir() {
        return Err(NoduleError::InputNotFound(path.to_path_buf()));
    }

    let include = build_include_set(&options.include)?;

    let mut walker = WalkDir::new(path).min_depth(1);
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    let mut hidden = 0;
    let entries = walker.into_iter().filter_entry(|entry| {
        if !options.include_hidden && is_hidden(entry) {
            hidden += 1;
            return false;
        }
        true
    });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                sink.emit(Diagnostic::new(
                    Level::Warn,
                    DiagnosticKind::Read,
                    format!("walk error: {}", e),
                ));
                stats.errors += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            stats.dirs_scanned += 1;
            continue;
        }
        if !entry.file_type().is_file() && !entry.path().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if let Some(include) = &include {
            if !include.is_match(relative) {
                stats.filtered_out += 1;
                continue;
            }
        }

        files.push(InputFile {
            path: entry.path().to_path_buf(),
            name,
        });
    }

    stats.hidden_skipped = hidden;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    stats.files_found = files.len();

    Ok((files, stats))
}
