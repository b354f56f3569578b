//! Text sanitization for extracted fragments
//!
//! Listing and article pages from the supported sites routinely carry zero-width
//! characters, non-breaking spaces and stray control bytes inside paragraphs.
//! Everything that reaches an [`Item`](crate::models::Item) goes through
//! [`clean_fragment`].

use crate::utils::normalize_whitespace;

/// Clean one text fragment
///
/// 1. Remove zero-width characters
/// 2. Remove control characters
/// 3. Collapse all whitespace (including U+00A0) to single spaces and trim
///
/// # Examples
///
/// ```
/// use newsharvest::parser::sanitize::clean_fragment;
///
/// let clean = clean_fragment("  Chứng\u{200B}khoán\u{a0}\u{a0}tăng\n điểm ");
/// assert_eq!(clean, "Chứngkhoán tăng điểm");
/// ```
pub fn clean_fragment(text: &str) -> String {
    let text = remove_zero_width(text);
    let text = remove_control_chars(&text);
    normalize_whitespace(&text)
}

/// Remove zero-width spaces and similar invisible characters
///
/// Removes U+200B..=U+200F, U+2028..=U+202F and the byte order mark.
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
