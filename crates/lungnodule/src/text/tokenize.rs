//! Shared word tokenizer used by phrase matching and the splitters.

use std::collections::HashSet;

/// Splits text into lower-cased word tokens with punctuation stripped.
///
/// A token is a run of alphanumeric characters. A `.` between two digits is
/// kept, so `2.3` stays a single token.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if ch == '.'
            && !current.is_empty()
            && current.chars().last().is_some_and(|c| c.is_ascii_digit())
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
        {
            current.push('.');
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Token set of `text`, as used by TOKENS matching.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Lower-cases and collapses runs of whitespace to a single space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(
            tokenize("Nodule, RUL; suspicious (for) malignancy."),
            vec!["nodule", "rul", "suspicious", "for", "malignancy"]
        );
    }

    #[test]
    fn test_tokenize_keeps_decimals() {
        assert_eq!(tokenize("measuring 2.3 cm."), vec!["measuring", "2.3", "cm"]);
        assert_eq!(tokenize("size 12. Next"), vec!["size", "12", "next"]);
    }

    #[test]
    fn test_tokenize_splits_hyphens() {
        assert_eq!(tokenize("Follow-up CT"), vec!["follow", "up", "ct"]);
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  No\tNodules\n\nidentified. "), "no nodules identified.");
        assert_eq!(normalize(""), "");
    }
}
