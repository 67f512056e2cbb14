//! Lazy row swaps.
//!
//! Swapping two rows only exchanges two entries in a pair of permutation tables.
//! The permutation is applied to every column in one pass, right before anything reads cells.

/// Pair of inverse permutations between logical row indices and the rows physically stored in
/// the columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapTracker {
    index_to_row: Vec<usize>,
    row_to_index: Vec<usize>,
    dirty: bool,
}

impl SwapTracker {
    /// Extends both tables with identity entries up to `index`.
    /// Tables never shrink, even when columns are removed.
    pub fn ensure_index(&mut self, index: usize) {
        for i in self.index_to_row.len()..=index {
            self.index_to_row.push(i);
            self.row_to_index.push(i);
        }
    }

    pub fn len(&self) -> usize {
        self.index_to_row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_row.is_empty()
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        self.ensure_index(a.max(b));
        let (row_a, row_b) = (self.index_to_row[a], self.index_to_row[b]);
        self.row_to_index.swap(row_a, row_b);
        self.index_to_row.swap(a, b);
        self.dirty = true;
    }

    /// Physical row currently holding logical row `index`.
    pub fn row_of(&self, index: usize) -> usize {
        self.index_to_row.get(index).copied().unwrap_or(index)
    }

    /// Logical index of physical row `row`.
    pub fn index_of(&self, row: usize) -> usize {
        self.row_to_index.get(row).copied().unwrap_or(row)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the map from physical rows to logical rows that must be applied to the columns,
    /// and resets both tables to the identity.
    /// [`None`] when no swap happened since the last flush.
    pub fn take_pending(&mut self) -> Option<Vec<usize>> {
        if !self.dirty {
            return None;
        }
        let map = self.row_to_index.clone();
        for (i, (row, index)) in self
            .index_to_row
            .iter_mut()
            .zip(self.row_to_index.iter_mut())
            .enumerate()
        {
            *row = i;
            *index = i;
        }
        self.dirty = false;
        Some(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_compose_into_one_permutation() {
        let mut swaps = SwapTracker::default();
        swaps.ensure_index(3);
        assert!(!swaps.is_dirty());
        assert_eq!(swaps.take_pending(), None);

        swaps.swap_rows(0, 1);
        swaps.swap_rows(1, 3);
        // Logical 1 now reads what was physically in row 3, logical 3 reads physical 0
        assert_eq!(swaps.row_of(0), 1);
        assert_eq!(swaps.row_of(1), 3);
        assert_eq!(swaps.row_of(3), 0);
        assert_eq!(swaps.index_of(0), 3);

        let map = swaps.take_pending().unwrap();
        assert_eq!(map, vec![3, 0, 2, 1]);
        assert!(!swaps.is_dirty());
        assert_eq!(swaps.row_of(3), 3);
    }

    #[test]
    fn swapping_twice_is_the_identity() {
        let mut swaps = SwapTracker::default();
        swaps.swap_rows(2, 5);
        swaps.swap_rows(5, 2);
        assert_eq!(swaps.len(), 6);
        assert_eq!(swaps.take_pending(), Some((0..6).collect()));
    }
}
