//! Row access: for every row, the columns holding a non-zero cell in it.
//!
//! The table stores column indices only; cells are owned by their columns.
//! Columns keep it in sync through [`ColumnRowLinks`].

use std::collections::BTreeSet;

use crate::columns::RowLinks;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAccess {
    rows: Vec<BTreeSet<usize>>,
    removable: bool,
}

impl RowAccess {
    /// With `removable` rows, empty trailing rows are dropped by [`erase_row`](Self::erase_row).
    pub fn new(removable: bool) -> Self {
        Self {
            rows: Vec::new(),
            removable,
        }
    }

    pub fn is_removable(&self) -> bool {
        self.removable
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn ensure_rows(&mut self, count: usize) {
        if self.rows.len() < count {
            self.rows.resize_with(count, BTreeSet::new);
        }
    }

    pub fn insert_cell(&mut self, row: usize, column: usize) {
        self.ensure_rows(row + 1);
        self.rows[row].insert(column);
    }

    pub fn remove_cell(&mut self, row: usize, column: usize) {
        if let Some(columns) = self.rows.get_mut(row) {
            columns.remove(&column);
        }
    }

    /// Columns with a non-zero cell in `row`, in increasing order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows.get(row).into_iter().flatten().copied()
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, BTreeSet::len)
    }

    /// Drops `row` if it is empty and rows are removable.
    /// Only trailing rows are dropped, so row indices never shift; an empty row in the middle
    /// stays until every row after it is gone.
    pub fn erase_row(&mut self, row: usize) {
        if !self.removable || row + 1 != self.rows.len() {
            return;
        }
        while self.rows.last().is_some_and(BTreeSet::is_empty) {
            self.rows.pop();
        }
    }

    /// Moves the contents of every row `r` to `row_map[r]`; rows beyond the map stay put.
    pub(crate) fn permute(&mut self, row_map: &[usize]) {
        let old = std::mem::take(&mut self.rows);
        let mut rows = Vec::new();
        rows.resize_with(old.len().max(row_map.len()), BTreeSet::new);
        for (row, columns) in old.into_iter().enumerate() {
            let target = crate::columns::remap_row(row_map, row);
            if target >= rows.len() {
                rows.resize_with(target + 1, BTreeSet::new);
            }
            rows[target] = columns;
        }
        if self.removable {
            while rows.last().is_some_and(BTreeSet::is_empty) {
                rows.pop();
            }
        }
        self.rows = rows;
    }

    pub fn links(&mut self, column: usize) -> ColumnRowLinks<'_> {
        ColumnRowLinks { rows: self, column }
    }
}

/// Forwards the cell changes of one column into a [`RowAccess`] table.
#[derive(Debug)]
pub struct ColumnRowLinks<'a> {
    rows: &'a mut RowAccess,
    column: usize,
}

impl RowLinks for ColumnRowLinks<'_> {
    fn link(&mut self, row: usize) {
        self.rows.insert_cell(row, self.column);
    }

    fn unlink(&mut self, row: usize) {
        self.rows.remove_cell(row, self.column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_update_the_table() {
        let mut rows = RowAccess::new(false);
        {
            let mut links = rows.links(3);
            links.link(2);
            links.link(5);
        }
        rows.links(1).link(5);
        assert_eq!(rows.row(5).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(rows.row_len(2), 1);
        assert_eq!(rows.row(9).count(), 0);

        rows.links(3).unlink(5);
        assert_eq!(rows.row(5).collect::<Vec<_>>(), vec![1]);
        assert_eq!(rows.number_of_rows(), 6);
    }

    #[test]
    fn erasing_only_drops_trailing_empty_rows() {
        let mut rows = RowAccess::new(true);
        rows.insert_cell(1, 0);
        rows.insert_cell(3, 0);
        rows.remove_cell(1, 0);
        rows.erase_row(1);
        assert_eq!(rows.number_of_rows(), 4);

        rows.remove_cell(3, 0);
        rows.erase_row(3);
        assert_eq!(rows.number_of_rows(), 0);

        let mut fixed = RowAccess::new(false);
        fixed.ensure_rows(3);
        fixed.erase_row(2);
        assert_eq!(fixed.number_of_rows(), 3);
    }

    #[test]
    fn permuting_moves_whole_rows() {
        let mut rows = RowAccess::new(false);
        rows.insert_cell(0, 4);
        rows.insert_cell(1, 5);
        rows.permute(&[1, 0]);
        assert_eq!(rows.row(0).collect::<Vec<_>>(), vec![5]);
        assert_eq!(rows.row(1).collect::<Vec<_>>(), vec![4]);
    }
}
