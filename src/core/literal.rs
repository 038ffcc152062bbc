//! Helpers for writing text into macro-language string literals.

/// Double every single quote so the text can sit inside `'...'`.
pub fn escape_quotes(text: &str) -> String {
    text.replace('\'', "''")
}

/// Reverse of [`escape_quotes`].
pub fn unescape_quotes(text: &str) -> String {
    text.replace("''", "'")
}

/// Split `text` into pieces of at most `size` characters.
///
/// Splits on character boundaries, so multi-byte text is never cut inside a
/// code point. Empty input yields a single empty piece.
pub fn chunk(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    if text.is_empty() {
        return vec![text];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == size {
            pieces.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&text[start..]);
    pieces
}
