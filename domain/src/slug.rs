//! Slug derivation for page urls.

/// Slug used when nothing usable remains of the input.
pub const EMPTY_SLUG: &str = "n-a";

/// Turn a page name into a url segment.
///
/// ASCII letters and digits are lower-cased and kept; every other run of
/// characters becomes a single `-`. Leading and trailing dashes are dropped.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        return EMPTY_SLUG.to_string();
    }
    out
}
