//! File name sanitization
//!
//! Resource names end up as the last segment of a backend key, so they must not carry
//! path separators or characters some backends reject.

use regex::Regex;
use std::sync::LazyLock;

/// Characters removed from resource names.
static RESERVED_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+^:&áàäéèëíìïóòöúùñÁÀÄÉÈËÍÌÏÓÒÖÚÙÜÑçÇ$()*#/><]")
        .expect("reserved character pattern is valid")
});

/// Sanitize a file name for use as a resource name.
///
/// Rules:
/// - Everything up to and including the last `/` or `\` is dropped
/// - Reserved punctuation and accented characters are removed
/// - Spaces become hyphens
///
/// Sanitizing an already sanitized name returns it unchanged.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base_name = match file_name.rfind(['/', '\\']) {
        Some(index) => &file_name[index + 1..],
        None => file_name,
    };
    RESERVED_CHARACTERS
        .replace_all(base_name, "")
        .replace(' ', "-")
}
