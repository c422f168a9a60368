use crate::types::{ALTERNATES_PER_ROW, DISPLAY_NAME_MAX_CHARS};

/// Shorten a username for the alternate cards. Prefers to cut at a space
/// near the end of the kept text; always appends `...` when shortened.
pub fn truncate_username(username: &str, max_chars: usize) -> String {
    if username.chars().count() <= max_chars {
        return username.to_string();
    }
    let kept: Vec<char> = username.chars().take(max_chars).collect();
    let cut = match kept.iter().rposition(|&c| c == ' ') {
        Some(pos) if pos + 4 > max_chars => pos,
        _ => kept.len(),
    };
    let head: String = kept[..cut].iter().collect();
    format!("{head}...")
}

pub fn display_name(username: &str) -> String {
    truncate_username(username, DISPLAY_NAME_MAX_CHARS)
}

/// Alternates are laid out four to a row; ranks stay global.
pub fn alternate_rows<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    items
        .chunks(ALTERNATES_PER_ROW)
        .map(|row| row.to_vec())
        .collect()
}
