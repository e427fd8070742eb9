//! Diagnostic events emitted by the extraction core.
//!
//! Components never log through ambient global state. Each one receives a
//! `&dyn DiagnosticSink` from its caller, and the driver decides where events
//! end up and which levels are kept.

use log::{Level, LevelFilter};
use std::fmt;
use std::sync::Mutex;

/// Category of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Input bytes could not be decoded with the configured encoding.
    Decode,
    /// Input file could not be read.
    Read,
    /// No rule matched; the default decision was used.
    NoRuleMatched,
    /// A measurement-like expression used a unit that cannot be normalized.
    SizeParseAmbiguity,
    /// A rule matched.
    RuleMatched,
    /// Batch-level progress or summary.
    Batch,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Decode => "decode",
            DiagnosticKind::Read => "read",
            DiagnosticKind::NoRuleMatched => "no_rule_matched",
            DiagnosticKind::SizeParseAmbiguity => "size_parse_ambiguity",
            DiagnosticKind::RuleMatched => "rule_matched",
            DiagnosticKind::Batch => "batch",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured diagnostic event.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub kind: DiagnosticKind,
    pub file: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: Level, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            file: None,
            message: message.into(),
        }
    }

    pub fn for_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Receiver of diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards events to the `log` facade, dropping anything above `max_level`.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    max_level: LevelFilter,
}

impl LogSink {
    pub fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if diagnostic.level > self.max_level {
            return;
        }
        match &diagnostic.file {
            Some(file) => log::log!(
                target: "lungnodule",
                diagnostic.level,
                "[{}] {}: {}",
                diagnostic.kind,
                file,
                diagnostic.message
            ),
            None => log::log!(
                target: "lungnodule",
                diagnostic.level,
                "[{}] {}",
                diagnostic.kind,
                diagnostic.message
            ),
        }
    }
}

/// Stamps every event with a file name before passing it on.
pub struct FileScoped<'a> {
    inner: &'a dyn DiagnosticSink,
    file: &'a str,
}

impl<'a> FileScoped<'a> {
    pub fn new(inner: &'a dyn DiagnosticSink, file: &'a str) -> Self {
        Self { inner, file }
    }
}

impl DiagnosticSink for FileScoped<'_> {
    fn emit(&self, diagnostic: Diagnostic) {
        let diagnostic = if diagnostic.file.is_none() {
            diagnostic.for_file(self.file)
        } else {
            diagnostic
        };
        self.inner.emit(diagnostic);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.kind == kind).count())
            .unwrap_or(0)
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::new(Level::Warn, DiagnosticKind::Decode, "bad bytes").for_file("a.txt"));
        sink.emit(Diagnostic::new(Level::Debug, DiagnosticKind::NoRuleMatched, "default"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].file.as_deref(), Some("a.txt"));
        assert_eq!(sink.count(DiagnosticKind::Decode), 1);
        assert_eq!(sink.count(DiagnosticKind::Read), 0);
    }

    #[test]
    fn test_file_scoped_stamps_missing_file() {
        let sink = MemorySink::new();
        let scoped = FileScoped::new(&sink, "report.txt");
        scoped.emit(Diagnostic::new(Level::Debug, DiagnosticKind::SizeParseAmbiguity, "3 m"));
        scoped.emit(Diagnostic::new(Level::Warn, DiagnosticKind::Read, "x").for_file("other.txt"));

        let events = sink.events();
        assert_eq!(events[0].file.as_deref(), Some("report.txt"));
        assert_eq!(events[1].file.as_deref(), Some("other.txt"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(DiagnosticKind::SizeParseAmbiguity.to_string(), "size_parse_ambiguity");
        assert_eq!(DiagnosticKind::Decode.as_str(), "decode");
    }
}
