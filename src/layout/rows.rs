//! Row estimation: how many table rows a record occupies.

/// Rows a record needs, given the wrapped line count of each of its fields.
///
/// Each field needs `ceil(count / lines_per_row)` rows; the record needs the
/// maximum over its fields, and never less than one row: a table row is
/// always drawn, even when every field is blank.
pub fn rows_needed(line_counts: &[usize], lines_per_row: usize) -> usize {
    debug_assert!(lines_per_row > 0, "lines_per_row must be positive");
    let lines_per_row = lines_per_row.max(1);
    line_counts
        .iter()
        .map(|&count| count.div_ceil(lines_per_row))
        .max()
        .unwrap_or(0)
        .max(1)
}
