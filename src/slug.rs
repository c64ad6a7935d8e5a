//! URL slugs for post titles and category names.
//!
//! Post keys, series keys and category keys are all slugs: the title
//! lowercased with accents stripped, and every run of other characters
//! collapsed into a single dash.
//!
//! ```text
//! "Series 1"               → "series-1"
//! "Not a Series: Subtitle" → "not-a-series-subtitle"
//! "  Brother Ride, Day 10" → "brother-ride-day-10"
//! "Café Été"               → "cafe-ete"
//! ```
//!
//! Accented letters are decomposed (Unicode NFKD) and their combining marks
//! dropped. Letters with no ASCII base, like `ß` or `ø`, still become dashes.
//!
//! Slugs end up in URLs and cache keys, so they are also truncated to a
//! reasonable length, breaking at the last dash before the limit.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const MAX_SLUG_LEN: usize = 80;

/// Turn a title into a URL-safe, lowercase slug.
///
/// - Strips accents from letters
/// - Replaces non-alphanumeric characters (except dashes) with dashes
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn slug(title: &str) -> String {
    let mut collapsed = String::with_capacity(title.len());
    let mut prev_dash = false;
    for c in title.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            collapsed.push('-');
            prev_dash = true;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}
