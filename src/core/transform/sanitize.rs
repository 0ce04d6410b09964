//! Text sanitization
//!
//! PostgreSQL rejects NUL bytes in text columns and the COPY path treats
//! several control characters specially, so every free-text field passes
//! through here before it is used as a lookup key or persisted.

/// Removes NUL and C0 control characters, keeping tab, newline and carriage return
pub fn sanitize_text(input: &str) -> String {
    if !input.chars().any(is_stripped) {
        return input.to_string();
    }
    input.chars().filter(|c| !is_stripped(*c)).collect()
}

/// Decodes `bytes` as UTF-8, dropping invalid sequences, then applies [`sanitize_text`]
pub fn sanitize_bytes(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        decoded.push_str(chunk.valid());
    }
    sanitize_text(&decoded)
}

fn is_stripped(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}

/// Replaces tab/newline/CR with spaces and collapses runs of whitespace
pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters without splitting a code point
pub(crate) fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((end, _)) => input[..end].to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("bot\0net", "botnet" ; "nul")]
    #[test_case("a\u{1}b\u{1f}c", "abc" ; "c0 controls")]
    #[test_case("line\tone\r\ntwo", "line\tone\r\ntwo" ; "whitespace kept")]
    #[test_case("Überwachung", "Überwachung" ; "non ascii kept")]
    #[test_case("", "" ; "empty")]
    fn test_sanitize_text(input: &str, expected: &str) {
        assert_eq!(sanitize_text(input), expected);
    }

    #[test]
    fn test_sanitize_bytes_drops_invalid_sequences() {
        let bytes = b"PT\xffExample\x00 Net\xc3";
        assert_eq!(sanitize_bytes(bytes), "PTExample Net");
    }

    #[test]
    fn test_sanitize_preserves_order() {
        let input = "z\u{0}y\u{2}x\tw";
        let output = sanitize_text(input);
        let kept: String = input.chars().filter(|c| !is_stripped(*c)).collect();
        assert_eq!(output, kept);
        assert!(output.chars().all(|c| !is_stripped(c)));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  PT  Example\n\tNet "), "PT Example Net");
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("ééééé", 3), "ééé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
