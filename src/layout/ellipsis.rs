//! Continuation markers for fields split across pages.
//!
//! Truncation counts characters, not glyph widths: the wrap boundaries are
//! fixed-width and the marker must not move them.

const MARKER: &str = "...";

/// Apply the continuation marker to one rendered line of a split field.
///
/// - The last line on a page, when more of the field follows on a later
///   page, loses its last three characters and ends in `"..."`.
/// - The first line on a page, when earlier lines of the field were drawn on
///   a previous page, is truncated the same way and starts with `"..."`.
///
/// Both rules can hit the same line. The suffix rule runs first on the
/// original line and the prefix rule runs on its result.
pub fn mark_continuation(
    line: &str,
    is_first_on_page: bool,
    is_last_on_page: bool,
    consumed_before: bool,
    more_after: bool,
) -> String {
    let mut marked = line.to_string();

    if is_last_on_page && more_after {
        marked = format!("{}{}", truncate_marker_room(&marked), MARKER);
    }
    if is_first_on_page && consumed_before {
        marked = format!("{}{}", MARKER, truncate_marker_room(&marked));
    }

    marked
}

/// The line without its last three characters (empty when shorter).
fn truncate_marker_room(line: &str) -> &str {
    let keep = line.chars().count().saturating_sub(MARKER.len());
    match line.char_indices().nth(keep) {
        Some((byte, _)) => &line[..byte],
        None => line,
    }
}
