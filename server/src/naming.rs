//! Storage name synthesis.
//!
//! A stored upload is named `{millis}-{original}`, where `original` is the
//! client-supplied filename reduced to a single path component.

pub const FALLBACK_FILENAME: &str = "file.bin";

pub fn storage_name(millis: u64, original: &str) -> String {
    format!("{}-{}", millis, original)
}

/// Makes an untrusted client filename safe to use as one path component.
pub fn sanitize_filename(filename: &str) -> String {
    if filename.trim().is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
