//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (post, category) is shown by its positional index and display
//! name first, with keys, series position and links as indented context
//! lines. The output reads as a content inventory while still showing the
//! keys URLs are built from.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Posts
//! 001 Spring Ride
//!     Key: spring-ride
//!     Older: brother-ride/day-2
//! 002 Brother Ride: Day 2 (12 photos)
//!     Key: brother-ride/day-2
//!     Series: part 2 of 2
//!     Newer: spring-ride
//!     Older: brother-ride
//!     Categories: when/2016
//! 003 Highlights
//!     Key: highlights
//!     Not chronological
//!
//! Categories
//! 001 When
//!     001 2016 (2 posts)
//!
//! Tags
//!     bike → Bicycle
//! ```
//!
//! ## Diff
//!
//! ```text
//! Changed
//!     brother-ride/day-3
//!     spring-ride
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::blog::PhotoBlog;
use crate::category::Category;
use crate::post::Post;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Positional index + name, with an optional counted noun.
///
/// ```text
/// 001 Brother Ride: Day 2 (12 photos)
/// 001 2016 (1 post)
/// 001 When
/// ```
fn entity_header(index: usize, name: &str, count: Option<(usize, &str)>) -> String {
    match count {
        Some((1, noun)) => format!("{} {} (1 {})", format_index(index), name, noun),
        Some((n, noun)) => format!("{} {} ({} {}s)", format_index(index), name, n, noun),
        None => format!("{} {}", format_index(index), name),
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

// ============================================================================
// Check output
// ============================================================================

fn neighbour_key<'a>(blog: &'a PhotoBlog, id: Option<&str>) -> Option<&'a str> {
    id.and_then(|id| blog.post_with_id(id)).map(|p| p.key.as_str())
}

fn post_lines(blog: &PhotoBlog, index: usize, post: &Post) -> Vec<String> {
    let name = post.name(&blog.config().subtitle_separator);
    let count = (post.photo_count > 0).then_some((post.photo_count, "photo"));
    let mut lines = vec![entity_header(index, &name, count)];

    let ctx = indent(1);
    lines.push(format!("{ctx}Key: {}", post.key));
    if post.is_partial {
        lines.push(format!(
            "{ctx}Series: part {} of {}",
            post.part, post.total_parts
        ));
    }
    if !post.chronological {
        lines.push(format!("{ctx}Not chronological"));
    }
    if let Some(key) = neighbour_key(blog, post.next.as_deref()) {
        lines.push(format!("{ctx}Newer: {key}"));
    }
    if let Some(key) = neighbour_key(blog, post.previous.as_deref()) {
        lines.push(format!("{ctx}Older: {key}"));
    }
    if post.has_categories() {
        let keys: Vec<&str> = post.categories.keys().map(String::as_str).collect();
        lines.push(format!("{ctx}Categories: {}", keys.join(", ")));
    }
    if let Some(description) = &post.description {
        let truncated = truncate_desc(description.trim(), 60);
        if !truncated.is_empty() {
            lines.push(format!("{ctx}{truncated}"));
        }
    }
    lines
}

fn category_lines(category: &Category, index: usize, depth: usize, lines: &mut Vec<String>) {
    let count = (!category.posts.is_empty()).then_some((category.posts.len(), "post"));
    lines.push(format!(
        "{}{}",
        indent(depth),
        entity_header(index, &category.title, count)
    ));
    for (i, sub) in category.subcategories.iter().enumerate() {
        category_lines(sub, i + 1, depth + 1, lines);
    }
}

/// Format the loaded blog: posts newest first, the category tree and tags.
pub fn format_blog(blog: &PhotoBlog) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    for (i, post) in blog.posts().enumerate() {
        lines.extend(post_lines(blog, i + 1, post));
    }

    let categories: Vec<&Category> = blog.categories().collect();
    if !categories.is_empty() {
        lines.push(String::new());
        lines.push("Categories".to_string());
        for (i, category) in categories.iter().enumerate() {
            category_lines(category, i + 1, 0, &mut lines);
        }
    }

    if !blog.tags().is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (slug, name) in blog.tags() {
            lines.push(format!("{}{} → {}", indent(1), slug, name));
        }
    }
    lines
}

/// Print the loaded blog to stdout.
pub fn print_blog(blog: &PhotoBlog) {
    for line in format_blog(blog) {
        println!("{}", line);
    }
}

// ============================================================================
// Diff output
// ============================================================================

/// Format the keys a reload changed.
pub fn format_changes(keys: &[String]) -> Vec<String> {
    if keys.is_empty() {
        return vec!["No changes".to_string()];
    }
    let mut lines = vec!["Changed".to_string()];
    lines.extend(keys.iter().map(|k| format!("{}{}", indent(1), k)));
    lines
}

/// Print changed keys to stdout.
pub fn print_changes(keys: &[String]) {
    for line in format_changes(keys) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostSort;
    use crate::test_helpers::mock_blog;
    use std::collections::BTreeMap;

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_four_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn entity_header_counts() {
        assert_eq!(entity_header(1, "When", None), "001 When");
        assert_eq!(entity_header(2, "2016", Some((1, "post"))), "002 2016 (1 post)");
        assert_eq!(
            entity_header(3, "Trip", Some((12, "photo"))),
            "003 Trip (12 photos)"
        );
    }

    #[test]
    fn truncate_desc_is_char_safe() {
        assert_eq!(truncate_desc("short", 60), "short");
        assert_eq!(truncate_desc("abcdef", 3), "abc...");
        assert_eq!(truncate_desc("Été été", 3), "Été...");
    }

    // =========================================================================
    // Check output
    // =========================================================================

    #[test]
    fn formats_series_member() {
        let blog = mock_blog(PostSort::OldestFirst);
        let lines = format_blog(&blog);
        let start = lines
            .iter()
            .position(|l| l == "005 Series 1: Part 2")
            .unwrap();
        assert_eq!(
            &lines[start..start + 6],
            [
                "005 Series 1: Part 2",
                "    Key: series-1/part-2",
                "    Series: part 2 of 3",
                "    Newer: series-1/part-3",
                "    Older: series-1",
                "    Categories: what/bicycle, when/2016",
            ]
        );
    }

    #[test]
    fn formats_non_chronological_post() {
        let blog = mock_blog(PostSort::OldestFirst);
        let lines = format_blog(&blog);
        assert_eq!(
            &lines[..4],
            ["Posts", "001 Highlights", "    Key: highlights", "    Not chronological"]
        );
    }

    #[test]
    fn formats_category_tree() {
        let blog = mock_blog(PostSort::OldestFirst);
        let lines = format_blog(&blog);
        let start = lines.iter().position(|l| l == "Categories").unwrap();
        assert_eq!(
            &lines[start..start + 6],
            [
                "Categories",
                "001 What",
                "    001 Bicycle (4 posts)",
                "002 When",
                "    001 2015 (1 post)",
                "    002 2016 (3 posts)",
            ]
        );
    }

    #[test]
    fn formats_tags_when_present() {
        let mut blog = mock_blog(PostSort::OldestFirst);
        assert!(!format_blog(&blog).contains(&"Tags".to_string()));

        blog.set_tags(BTreeMap::from([("bike".to_string(), "Bicycle".to_string())]));
        let lines = format_blog(&blog);
        assert_eq!(lines.last().map(String::as_str), Some("    bike → Bicycle"));
    }

    // =========================================================================
    // Diff output
    // =========================================================================

    #[test]
    fn formats_changes() {
        let keys = vec!["title-4".to_string(), "series-1/part-3".to_string()];
        assert_eq!(
            format_changes(&keys),
            ["Changed", "    title-4", "    series-1/part-3"]
        );
    }

    #[test]
    fn formats_no_changes() {
        assert_eq!(format_changes(&[]), ["No changes"]);
    }
}
