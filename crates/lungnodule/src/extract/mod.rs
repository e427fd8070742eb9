pub mod batch;
pub mod orchestrator;
pub mod size;

pub use batch::{extract_directory, run_batch, BatchOptions, DecodeErrorPolicy};
pub use orchestrator::{ExtractOptions, ExtractionResult, Extractor, FileError};
pub use size::{extract_max_size, max_size_in, measurements, Measurement, SizeScope};
