use super::size::{extract_max_size, SizeScope};
use crate::classify::{
    Algorithm, CompiledRules, Decision, Document, FailureKind, RuleEngine, RuleSet, SearchConfig,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, FileScoped};
use crate::error::Result;
use crate::index::{decode, resolve_encoding, InputFile};
use crate::text::{PunktParameters, Sentence, SplitterKind};
use encoding_rs::Encoding;
use log::Level;
use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything needed to build an [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub algorithm: Algorithm,
    /// Custom rule table; replaces the algorithm's built-in table.
    pub rules_path: Option<PathBuf>,
    pub search: SearchConfig,
    pub extract_size: bool,
    pub size_scope: SizeScope,
    pub use_base_splitter: bool,
    /// Trained Punkt parameters; ignored with the base splitter.
    pub splitter_model: Option<PathBuf>,
    /// WHATWG encoding label.
    pub encoding: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            rules_path: None,
            search: SearchConfig::default(),
            extract_size: false,
            size_scope: SizeScope::default(),
            use_base_splitter: false,
            splitter_model: None,
            encoding: "utf-8".to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn load_rules(&self) -> Result<RuleSet> {
        match &self.rules_path {
            Some(path) => RuleSet::from_file(path),
            None => self.algorithm.rule_set(),
        }
    }

    pub fn load_splitter(&self) -> Result<SplitterKind> {
        if self.use_base_splitter {
            return Ok(SplitterKind::base());
        }
        match &self.splitter_model {
            Some(path) => Ok(SplitterKind::punkt(PunktParameters::from_file(path)?)),
            None => Ok(SplitterKind::punkt(PunktParameters::english())),
        }
    }
}

/// A per-file failure, reported instead of a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileError {
    pub file: String,
    pub kind: FailureKind,
    pub message: String,
}

/// The outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub file: String,
    pub decision: Decision,
    pub rule: Option<u32>,
    /// Largest measurement in millimetres, when requested and found.
    pub max_nodule_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl ExtractionResult {
    pub fn failed(file: &str, kind: FailureKind, message: String) -> Self {
        Self {
            file: file.to_string(),
            decision: Decision::Failed { kind },
            rule: None,
            max_nodule_size: None,
            error: Some(FileError {
                file: file.to_string(),
                kind,
                message,
            }),
        }
    }
}

/// Runs decode, split, classify and size extraction for single documents.
///
/// All configuration is resolved in [`Extractor::new`]; processing a document
/// cannot fail with a configuration error. An `Extractor` is immutable and can
/// be shared between threads.
#[derive(Debug, Clone)]
pub struct Extractor {
    engine: RuleEngine,
    splitter: SplitterKind,
    encoding: &'static Encoding,
    extract_size: bool,
    size_scope: SizeScope,
}

impl Extractor {
    pub fn new(options: &ExtractOptions) -> Result<Self> {
        let encoding = resolve_encoding(&options.encoding)?;
        let rules = options.load_rules()?.compile(options.search)?;
        let splitter = options.load_splitter()?;

        Ok(Self {
            engine: RuleEngine::new(Arc::new(rules)),
            splitter,
            encoding,
            extract_size: options.extract_size,
            size_scope: options.size_scope,
        })
    }

    pub fn rules(&self) -> &CompiledRules {
        self.engine.rules()
    }

    pub fn splitter(&self) -> &SplitterKind {
        &self.splitter
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Read and process one input file. Read failures become a `read` result.
    pub fn process_file(&self, input: &InputFile, sink: &dyn DiagnosticSink) -> ExtractionResult {
        match std::fs::read(&input.path) {
            Ok(bytes) => self.process_bytes(&input.name, &bytes, sink),
            Err(e) => {
                let message = format!("cannot read {}: {}", input.path.display(), e);
                sink.emit(
                    Diagnostic::new(Level::Warn, DiagnosticKind::Read, message.clone())
                        .for_file(input.name.as_str()),
                );
                ExtractionResult::failed(&input.name, FailureKind::Read, message)
            }
        }
    }

    pub fn process_bytes(&self, file: &str, bytes: &[u8], sink: &dyn DiagnosticSink) -> ExtractionResult {
        match decode(file, bytes, self.encoding) {
            Ok(text) => self.process_text(file, &text, sink),
            Err(e) => {
                let message = e.to_string();
                sink.emit(
                    Diagnostic::new(Level::Warn, DiagnosticKind::Decode, message.clone()).for_file(file),
                );
                ExtractionResult::failed(file, FailureKind::Decode, message)
            }
        }
    }

    pub fn process_text(&self, file: &str, text: &str, sink: &dyn DiagnosticSink) -> ExtractionResult {
        let sink = FileScoped::new(sink, file);
        let sentences = self.splitter.split(text);
        let outcome = self.engine.classify(&Document::new(text, &sentences));

        match &outcome.decision {
            Decision::Matched { rule, label } => sink.emit(Diagnostic::new(
                Level::Debug,
                DiagnosticKind::RuleMatched,
                format!("rule {} -> {} (sentences {:?})", rule, label, outcome.witnesses),
            )),
            Decision::NoMatch { label } => sink.emit(Diagnostic::new(
                Level::Debug,
                DiagnosticKind::NoRuleMatched,
                format!("no rule matched, using default '{}'", label),
            )),
            Decision::Failed { .. } => {}
        }

        let max_nodule_size = if self.extract_size {
            let scanned = self.size_sentences(&sentences, &outcome.witnesses);
            extract_max_size(&scanned, &sink)
        } else {
            None
        };

        ExtractionResult {
            file: file.to_string(),
            rule: outcome.decision.rule(),
            decision: outcome.decision,
            max_nodule_size,
            error: None,
        }
    }

    fn size_sentences<'a>(&self, sentences: &'a [Sentence], witnesses: &[usize]) -> Cow<'a, [Sentence]> {
        match self.size_scope {
            SizeScope::Matched if !witnesses.is_empty() => Cow::Owned(
                sentences
                    .iter()
                    .filter(|s| witnesses.binary_search(&s.index).is_ok())
                    .cloned()
                    .collect(),
            ),
            _ => Cow::Borrowed(sentences),
        }
    }
}
