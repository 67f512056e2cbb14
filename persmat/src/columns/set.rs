//! Ordered map from row to coefficient.

use std::collections::{btree_map::Entry, BTreeMap};

use super::{remap_row, Cell, Column, RowLinks};
use crate::fields::FieldOperators;

#[derive(Clone, Debug)]
pub struct SetColumn<F: FieldOperators> {
    cells: BTreeMap<usize, F::Coeff>,
    dimension: usize,
}

impl<F: FieldOperators> Default for SetColumn<F> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
            dimension: 0,
        }
    }
}

impl<F: FieldOperators> SetColumn<F> {
    fn accumulate<L: RowLinks + ?Sized>(
        &mut self,
        row: usize,
        coeff: F::Coeff,
        field: &F,
        links: &mut L,
    ) {
        match self.cells.entry(row) {
            Entry::Vacant(entry) => {
                entry.insert(coeff);
                links.link(row);
            }
            Entry::Occupied(mut entry) => match field.add(*entry.get(), coeff) {
                Some(sum) => {
                    entry.insert(sum);
                }
                None => {
                    entry.remove();
                    links.unlink(row);
                }
            },
        }
    }
}

impl<F: FieldOperators> Column<F> for SetColumn<F> {
    fn from_cells<L: RowLinks + ?Sized>(
        cells: Vec<Cell<F::Coeff>>,
        dimension: usize,
        links: &mut L,
    ) -> Self {
        let cells = cells
            .into_iter()
            .map(|cell| {
                links.link(cell.row);
                (cell.row, cell.coeff)
            })
            .collect();
        Self { cells, dimension }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn pivot(&mut self, _field: &F) -> Option<usize> {
        self.cells.last_key_value().map(|(row, _)| *row)
    }

    fn pivot_value(&mut self, _field: &F) -> Option<F::Coeff> {
        self.cells.last_key_value().map(|(_, coeff)| *coeff)
    }

    fn coefficient(&mut self, row: usize, _field: &F) -> Option<F::Coeff> {
        self.cells.get(&row).copied()
    }

    fn entries(&mut self, _field: &F) -> Vec<Cell<F::Coeff>> {
        self.cells
            .iter()
            .map(|(&row, &coeff)| Cell { row, coeff })
            .collect()
    }

    fn clear<L: RowLinks + ?Sized>(&mut self, links: &mut L) {
        for row in std::mem::take(&mut self.cells).into_keys() {
            links.unlink(row);
        }
    }

    fn clear_row<L: RowLinks + ?Sized>(&mut self, row: usize, _field: &F, links: &mut L) {
        if self.cells.remove(&row).is_some() {
            links.unlink(row);
        }
    }

    fn add<L: RowLinks + ?Sized>(&mut self, other: &Self, field: &F, links: &mut L) {
        for (&row, &coeff) in &other.cells {
            self.accumulate(row, coeff, field, links);
        }
    }

    fn scale<L: RowLinks + ?Sized>(&mut self, coeff: F::Coeff, field: &F, links: &mut L) {
        self.cells
            .retain(|&row, current| match field.multiply(*current, coeff) {
                Some(product) => {
                    *current = product;
                    true
                }
                None => {
                    links.unlink(row);
                    false
                }
            });
    }

    fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &Self,
        coeff: F::Coeff,
        field: &F,
        links: &mut L,
    ) {
        for (&row, &other_coeff) in &other.cells {
            if let Some(scaled) = field.multiply(other_coeff, coeff) {
                self.accumulate(row, scaled, field, links);
            }
        }
    }

    fn reorder(&mut self, row_map: &[usize], _field: &F) {
        self.cells = std::mem::take(&mut self.cells)
            .into_iter()
            .map(|(row, coeff)| (remap_row(row_map, row), coeff))
            .collect();
    }
}
