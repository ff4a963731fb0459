//! # Page Break Decisions
//!
//! Whether a record goes onto the current page whole or gets split across
//! a page boundary. Records are never moved to the next page as a unit: a
//! record that does not fit fills the remaining rows first.

/// What to do with a record on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Every row of the record fits on the current page.
    Fits,
    /// Place some rows here and continue on following pages.
    Split {
        /// How many of the record's rows land on the current page.
        rows_on_current_page: usize,
    },
}

/// Decide how a record needing `rows_needed` rows is placed when
/// `available_rows` rows are left on the current page.
pub fn decide_placement(rows_needed: usize, available_rows: usize) -> Placement {
    if rows_needed <= available_rows {
        Placement::Fits
    } else {
        Placement::Split {
            rows_on_current_page: available_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits() {
        assert_eq!(decide_placement(3, 8), Placement::Fits);
    }

    #[test]
    fn exact_fit_is_not_a_split() {
        assert_eq!(decide_placement(8, 8), Placement::Fits);
        assert_eq!(decide_placement(1, 1), Placement::Fits);
    }

    #[test]
    fn overflow_splits_at_remaining_rows() {
        assert_eq!(
            decide_placement(3, 2),
            Placement::Split {
                rows_on_current_page: 2,
            }
        );
    }

    #[test]
    fn record_taller_than_a_page_splits_from_the_top() {
        assert_eq!(
            decide_placement(20, 8),
            Placement::Split {
                rows_on_current_page: 8,
            }
        );
    }
}
