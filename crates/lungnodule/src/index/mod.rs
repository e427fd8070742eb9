pub mod decode;
pub mod scanner;

pub use decode::{decode, resolve_encoding};
pub use scanner::{scan_directory, InputFile, ScanOptions, ScanStats};
