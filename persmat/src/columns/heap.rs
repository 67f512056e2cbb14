//! Binary heap representation of a column, essentially a linear combination with a leading term.
//!
//! Additions only push the other column's raw entries, so the heap may hold several entries per
//! row whose coefficients have not been summed yet.
//! Entries are consolidated lazily: when the pivot is requested, or when the heap grows past twice
//! the size it had after the last consolidation.
//! Because cells appear and disappear without being observed, this strategy cannot maintain
//! row access.

use std::{collections::BinaryHeap, fmt::Debug, iter::repeat};

use super::{remap_row, Cell, Column, RowLinks};
use crate::fields::FieldOperators;

/// WARNING: Equality only checks row index - to check the coefficient, convert to a [`Cell`]
#[derive(Clone, Copy)]
struct HeapEntry<C>(Cell<C>);

impl<C: Debug> Debug for HeapEntry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("({:?} * {:?})", self.0.coeff, self.0.row))
    }
}

impl<C> PartialEq for HeapEntry<C> {
    fn eq(&self, other: &Self) -> bool {
        self.0.row.eq(&other.0.row)
    }
}

impl<C> Eq for HeapEntry<C> {}

impl<C> PartialOrd for HeapEntry<C> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for HeapEntry<C> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.row.cmp(&other.0.row)
    }
}

pub struct HeapColumn<F: FieldOperators> {
    heap: BinaryHeap<HeapEntry<F::Coeff>>,
    consolidated_len: usize,
    dimension: usize,
}

impl<F: FieldOperators> Clone for HeapColumn<F> {
    fn clone(&self) -> Self {
        Self {
            heap: self.heap.clone(),
            consolidated_len: self.consolidated_len,
            dimension: self.dimension,
        }
    }
}

impl<F: FieldOperators> Debug for HeapColumn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(&self.heap).finish()
    }
}

impl<F: FieldOperators> Default for HeapColumn<F> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::default(),
            consolidated_len: 0,
            dimension: 0,
        }
    }
}

impl<F: FieldOperators> HeapColumn<F> {
    /// Number of raw entries, including unsummed duplicates.
    pub fn raw_len(&self) -> usize {
        self.heap.len()
    }

    fn push(&mut self, cell: Cell<F::Coeff>) {
        self.heap.push(HeapEntry(cell));
    }

    /// Removes and returns the largest row whose summed coefficient is non-zero.
    /// Rows summing to zero on the way are discarded.
    fn pop_pivot(&mut self, field: &F) -> Option<Cell<F::Coeff>> {
        // Pull out first entry
        let HeapEntry(first_entry) = self.heap.pop()?;
        let mut working_row = first_entry.row;
        let mut working_sum = Some(first_entry.coeff);

        loop {
            // No more elements, break and report pivot
            let Some(HeapEntry(next_entry)) = self.heap.peek() else {
                break;
            };

            // Check if next row is different
            if next_entry.row != working_row {
                if working_sum.is_some() {
                    // Found the largest row with non-zero coefficient, report
                    break;
                }
                // Otherwise we prepare to start adding the next largest row
                working_row = next_entry.row;
                working_sum = None;
            }

            // Actually remove from heap
            let HeapEntry(next_entry) = self.heap.pop().expect("If None would have broke earlier");
            working_sum = field.add_option(next_entry.coeff, working_sum);
        }

        working_sum.map(|coeff| Cell {
            row: working_row,
            coeff,
        })
    }

    fn clone_pivot(&mut self, field: &F) -> Option<Cell<F::Coeff>> {
        let pivot = self.pop_pivot(field)?;
        self.push(pivot);
        Some(pivot)
    }

    fn drain_sorted<'a>(&'a mut self, field: &'a F) -> impl Iterator<Item = Cell<F::Coeff>> + 'a {
        repeat(()).map_while(|()| self.pop_pivot(field))
    }

    /// Sums duplicate rows and drops zeros, returning the cells sorted by row.
    fn consolidate(&mut self, field: &F) -> Vec<Cell<F::Coeff>> {
        let mut cells: Vec<_> = self.drain_sorted(field).collect();
        cells.reverse();
        self.rebuild(cells.iter().copied());
        cells
    }

    fn rebuild(&mut self, cells: impl Iterator<Item = Cell<F::Coeff>>) {
        self.heap = cells.map(HeapEntry).collect();
        self.consolidated_len = self.heap.len();
    }

    fn prune_if_bloated(&mut self, field: &F) {
        if self.heap.len() > 2 * self.consolidated_len.max(1) {
            self.consolidate(field);
        }
    }
}

impl<F: FieldOperators> Column<F> for HeapColumn<F> {
    const SUPPORTS_ROW_ACCESS: bool = false;

    fn from_cells<L: RowLinks + ?Sized>(
        cells: Vec<Cell<F::Coeff>>,
        dimension: usize,
        _links: &mut L,
    ) -> Self {
        let mut column = Self {
            dimension,
            ..Self::default()
        };
        column.rebuild(cells.into_iter());
        column
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn pivot(&mut self, field: &F) -> Option<usize> {
        self.clone_pivot(field).map(|cell| cell.row)
    }

    fn pivot_value(&mut self, field: &F) -> Option<F::Coeff> {
        self.clone_pivot(field).map(|cell| cell.coeff)
    }

    fn coefficient(&mut self, row: usize, field: &F) -> Option<F::Coeff> {
        self.heap
            .iter()
            .filter(|HeapEntry(cell)| cell.row == row)
            .fold(None, |sum, HeapEntry(cell)| field.add_option(cell.coeff, sum))
    }

    fn entries(&mut self, field: &F) -> Vec<Cell<F::Coeff>> {
        self.consolidate(field)
    }

    fn clear<L: RowLinks + ?Sized>(&mut self, _links: &mut L) {
        self.heap.clear();
        self.consolidated_len = 0;
    }

    fn clear_row<L: RowLinks + ?Sized>(&mut self, row: usize, _field: &F, _links: &mut L) {
        self.heap.retain(|HeapEntry(cell)| cell.row != row);
    }

    fn add<L: RowLinks + ?Sized>(&mut self, other: &Self, field: &F, _links: &mut L) {
        self.heap.extend(other.heap.iter().copied());
        self.prune_if_bloated(field);
    }

    // Scaling distributes over unsummed duplicates, so no consolidation is needed
    fn scale<L: RowLinks + ?Sized>(&mut self, coeff: F::Coeff, field: &F, _links: &mut L) {
        let heap = std::mem::take(&mut self.heap).into_vec();
        self.heap = heap
            .into_iter()
            .filter_map(|HeapEntry(cell)| {
                field
                    .multiply(cell.coeff, coeff)
                    .map(|coeff| HeapEntry(Cell { row: cell.row, coeff }))
            })
            .collect();
    }

    fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &Self,
        coeff: F::Coeff,
        field: &F,
        _links: &mut L,
    ) {
        self.heap.extend(other.heap.iter().filter_map(|HeapEntry(cell)| {
            field
                .multiply(cell.coeff, coeff)
                .map(|coeff| HeapEntry(Cell { row: cell.row, coeff }))
        }));
        self.prune_if_bloated(field);
    }

    fn reorder(&mut self, row_map: &[usize], _field: &F) {
        let heap = std::mem::take(&mut self.heap).into_vec();
        self.heap = heap
            .into_iter()
            .map(|HeapEntry(cell)| {
                HeapEntry(Cell {
                    row: remap_row(row_map, cell.row),
                    coeff: cell.coeff,
                })
            })
            .collect();
    }
}
