//! Default display names from raw file names

use std::path::Path;

/// Label used when a file name has no usable characters
pub const UNTITLED: &str = "Untitled";

/// Derive a human-readable label from a file name
///
/// Strips the extension, turns runs of `_`/`-` into single spaces and
/// capitalises the first letter of every word.
///
/// ```
/// use vavatar_ingest::services::naming::derive_display_name;
///
/// assert_eq!(derive_display_name("long_call.wav"), "Long Call");
/// assert_eq!(derive_display_name("my--voice__note.mp3"), "My Voice Note");
/// ```
pub fn derive_display_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let spaced: String = stem
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();

    let words: Vec<String> = spaced.split_whitespace().map(capitalize).collect();
    if words.is_empty() {
        return UNTITLED.to_string();
    }
    words.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
