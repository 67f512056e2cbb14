//! Sorted vector of cells; additions are a linear merge.

use itertools::{EitherOrBoth, Itertools};

use super::{remap_row, Cell, Column, RowLinks};
use crate::fields::FieldOperators;

#[derive(Clone, Debug)]
pub struct SparseColumn<F: FieldOperators> {
    cells: Vec<Cell<F::Coeff>>,
    dimension: usize,
}

impl<F: FieldOperators> Default for SparseColumn<F> {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            dimension: 0,
        }
    }
}

impl<F: FieldOperators> SparseColumn<F> {
    /// Cells sorted by row, without consolidation work.
    pub fn cells(&self) -> &[Cell<F::Coeff>] {
        &self.cells
    }

    fn position(&self, row: usize) -> Result<usize, usize> {
        self.cells.binary_search_by_key(&row, |cell| cell.row)
    }

    /// Merges `other` into `self`, scaling the cells of each side first.
    /// A scale of `None` leaves that side untouched.
    fn merge<L: RowLinks + ?Sized>(
        &mut self,
        self_scale: Option<F::Coeff>,
        other: &Self,
        other_scale: Option<F::Coeff>,
        field: &F,
        links: &mut L,
    ) {
        let scaled = |coeff: F::Coeff, scale: Option<F::Coeff>| match scale {
            None => Some(coeff),
            Some(scale) => field.multiply(coeff, scale),
        };

        let current = std::mem::take(&mut self.cells);
        let mut merged = Vec::with_capacity(current.len() + other.cells.len());
        for pair in current
            .into_iter()
            .merge_join_by(other.cells.iter().copied(), |a, b| a.row.cmp(&b.row))
        {
            let (row, had_cell, coeff) = match pair {
                EitherOrBoth::Left(a) => (a.row, true, scaled(a.coeff, self_scale)),
                EitherOrBoth::Right(b) => (b.row, false, scaled(b.coeff, other_scale)),
                EitherOrBoth::Both(a, b) => {
                    let left = scaled(a.coeff, self_scale);
                    let right = scaled(b.coeff, other_scale);
                    let sum = match (left, right) {
                        (Some(l), r) => field.add_option(l, r),
                        (None, r) => r,
                    };
                    (a.row, true, sum)
                }
            };
            match (had_cell, coeff) {
                (true, Some(coeff)) => merged.push(Cell { row, coeff }),
                (false, Some(coeff)) => {
                    links.link(row);
                    merged.push(Cell { row, coeff });
                }
                (true, None) => links.unlink(row),
                (false, None) => {}
            }
        }
        self.cells = merged;
    }
}

impl<F: FieldOperators> Column<F> for SparseColumn<F> {
    fn from_cells<L: RowLinks + ?Sized>(
        cells: Vec<Cell<F::Coeff>>,
        dimension: usize,
        links: &mut L,
    ) -> Self {
        for cell in &cells {
            links.link(cell.row);
        }
        Self { cells, dimension }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn pivot(&mut self, _field: &F) -> Option<usize> {
        self.cells.last().map(|cell| cell.row)
    }

    fn pivot_value(&mut self, _field: &F) -> Option<F::Coeff> {
        self.cells.last().map(|cell| cell.coeff)
    }

    fn coefficient(&mut self, row: usize, _field: &F) -> Option<F::Coeff> {
        self.position(row).ok().map(|idx| self.cells[idx].coeff)
    }

    fn entries(&mut self, _field: &F) -> Vec<Cell<F::Coeff>> {
        self.cells.clone()
    }

    fn clear<L: RowLinks + ?Sized>(&mut self, links: &mut L) {
        for cell in self.cells.drain(..) {
            links.unlink(cell.row);
        }
    }

    fn clear_row<L: RowLinks + ?Sized>(&mut self, row: usize, _field: &F, links: &mut L) {
        if let Ok(idx) = self.position(row) {
            self.cells.remove(idx);
            links.unlink(row);
        }
    }

    fn add<L: RowLinks + ?Sized>(&mut self, other: &Self, field: &F, links: &mut L) {
        self.merge(None, other, None, field, links);
    }

    fn scale<L: RowLinks + ?Sized>(&mut self, coeff: F::Coeff, field: &F, links: &mut L) {
        self.cells.retain_mut(|cell| match field.multiply(cell.coeff, coeff) {
            Some(product) => {
                cell.coeff = product;
                true
            }
            None => {
                links.unlink(cell.row);
                false
            }
        });
    }

    fn multiply_target_and_add<L: RowLinks + ?Sized>(
        &mut self,
        coeff: F::Coeff,
        other: &Self,
        field: &F,
        links: &mut L,
    ) {
        self.merge(Some(coeff), other, None, field, links);
    }

    fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &Self,
        coeff: F::Coeff,
        field: &F,
        links: &mut L,
    ) {
        self.merge(None, other, Some(coeff), field, links);
    }

    fn reorder(&mut self, row_map: &[usize], _field: &F) {
        for cell in self.cells.iter_mut() {
            cell.row = remap_row(row_map, cell.row);
        }
        self.cells.sort_unstable_by_key(|cell| cell.row);
    }
}
