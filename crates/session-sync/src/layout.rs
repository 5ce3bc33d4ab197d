//! Grid layout for the participant container.

use serde::Serialize;

/// Rows and columns of the participant grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
}

/// Compute the grid for a participant count.
///
/// Deterministic and monotonic non-decreasing in `participants`; the grid
/// caps at 3x3. An empty container uses the single-tile grid.
#[must_use]
pub const fn grid_layout(participants: usize) -> GridLayout {
    let (rows, columns) = match participants {
        0 | 1 => (1, 1),
        2 => (1, 2),
        3 | 4 => (2, 2),
        5 | 6 => (2, 3),
        _ => (3, 3),
    };
    GridLayout { rows, columns }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout_table() {
        let expected = [
            (1, (1, 1)),
            (2, (1, 2)),
            (3, (2, 2)),
            (4, (2, 2)),
            (5, (2, 3)),
            (6, (2, 3)),
            (7, (3, 3)),
            (9, (3, 3)),
        ];

        for (count, (rows, columns)) in expected {
            assert_eq!(
                grid_layout(count),
                GridLayout { rows, columns },
                "participant count {count}"
            );
        }
    }

    #[test]
    fn test_grid_layout_is_monotonic() {
        let mut previous = grid_layout(0);
        for count in 1..=32 {
            let current = grid_layout(count);
            assert!(current.rows >= previous.rows, "rows shrank at {count}");
            assert!(
                current.columns >= previous.columns,
                "columns shrank at {count}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_grid_layout_empty_container() {
        assert_eq!(grid_layout(0), GridLayout { rows: 1, columns: 1 });
    }
}
