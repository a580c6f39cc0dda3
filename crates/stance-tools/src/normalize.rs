//! Post text normalization

/// Collapse whitespace runs to single spaces, trim, and cut to `max_chars`
/// characters. Cutting never splits a character.
#[must_use]
pub fn normalize_text(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((end, _)) => collapsed[..end].trim_end().to_string(),
        None => collapsed,
    }
}
