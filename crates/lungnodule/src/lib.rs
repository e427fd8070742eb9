pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod index;
pub mod report;
pub mod text;
pub mod util;

pub use classify::{
    Algorithm, CompiledRules, Condition, Decision, Document, EngineState, FailureKind, Outcome,
    RuleDef, RuleEngine, RuleSet, SearchConfig,
};
pub use config::{Config, Settings};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink, MemorySink, NullSink};
pub use error::{NoduleError, Result};
pub use extract::{
    extract_directory, extract_max_size, run_batch, BatchOptions, DecodeErrorPolicy,
    ExtractOptions, ExtractionResult, Extractor, FileError, SizeScope,
};
pub use index::{scan_directory, InputFile, ScanOptions};
pub use text::{
    split, Phrase, PunktParameters, PunktSplitter, PunktTrainer, Scope, SearchMethod, Sentence,
    SentenceSplitter, SplitterKind,
};
