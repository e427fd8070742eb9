//! Byte-to-text decoding of input documents.

use crate::error::{NoduleError, Result};
use encoding_rs::Encoding;

/// Resolves a WHATWG encoding label such as `utf-8`, `latin1` or `windows-1252`.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| NoduleError::UnknownEncoding(label.to_string()))
}

/// Decode `bytes` strictly. A byte order mark overrides `encoding`.
///
/// Malformed input is an error rather than being replaced.
pub fn decode(file: &str, bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) => (bom_encoding, &bytes[bom_len..]),
        None => (encoding, bytes),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| NoduleError::Decode {
            file: file.to_string(),
            encoding: encoding.name().to_string(),
        })
}
