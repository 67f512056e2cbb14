//! One slot per row up to the pivot.
//! The vector is trimmed after every mutation so that its last slot is always occupied.

use super::{remap_row, Cell, Column, RowLinks};
use crate::fields::FieldOperators;

#[derive(Clone, Debug)]
pub struct DenseColumn<F: FieldOperators> {
    slots: Vec<Option<F::Coeff>>,
    dimension: usize,
}

impl<F: FieldOperators> Default for DenseColumn<F> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            dimension: 0,
        }
    }
}

impl<F: FieldOperators> DenseColumn<F> {
    fn trim(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }

    fn grow_to(&mut self, len: usize) {
        if self.slots.len() < len {
            self.slots.resize(len, None);
        }
    }

    fn accumulate<L: RowLinks + ?Sized>(
        &mut self,
        row: usize,
        coeff: Option<F::Coeff>,
        field: &F,
        links: &mut L,
    ) {
        let Some(coeff) = coeff else {
            return;
        };
        let slot = &mut self.slots[row];
        match *slot {
            None => {
                *slot = Some(coeff);
                links.link(row);
            }
            Some(current) => {
                *slot = field.add(current, coeff);
                if slot.is_none() {
                    links.unlink(row);
                }
            }
        }
    }
}

impl<F: FieldOperators> Column<F> for DenseColumn<F> {
    fn from_cells<L: RowLinks + ?Sized>(
        cells: Vec<Cell<F::Coeff>>,
        dimension: usize,
        links: &mut L,
    ) -> Self {
        let mut column = Self {
            slots: Vec::new(),
            dimension,
        };
        if let Some(last) = cells.last() {
            column.grow_to(last.row + 1);
        }
        for cell in cells {
            column.slots[cell.row] = Some(cell.coeff);
            links.link(cell.row);
        }
        column
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn pivot(&mut self, _field: &F) -> Option<usize> {
        self.slots.len().checked_sub(1)
    }

    fn pivot_value(&mut self, _field: &F) -> Option<F::Coeff> {
        self.slots.last().copied().flatten()
    }

    fn coefficient(&mut self, row: usize, _field: &F) -> Option<F::Coeff> {
        self.slots.get(row).copied().flatten()
    }

    fn entries(&mut self, _field: &F) -> Vec<Cell<F::Coeff>> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(row, slot)| slot.map(|coeff| Cell { row, coeff }))
            .collect()
    }

    fn clear<L: RowLinks + ?Sized>(&mut self, links: &mut L) {
        for (row, slot) in self.slots.drain(..).enumerate() {
            if slot.is_some() {
                links.unlink(row);
            }
        }
    }

    fn clear_row<L: RowLinks + ?Sized>(&mut self, row: usize, _field: &F, links: &mut L) {
        if let Some(slot) = self.slots.get_mut(row) {
            if slot.take().is_some() {
                links.unlink(row);
                self.trim();
            }
        }
    }

    fn add<L: RowLinks + ?Sized>(&mut self, other: &Self, field: &F, links: &mut L) {
        self.grow_to(other.slots.len());
        for (row, coeff) in other.slots.iter().enumerate() {
            self.accumulate(row, *coeff, field, links);
        }
        self.trim();
    }

    fn scale<L: RowLinks + ?Sized>(&mut self, coeff: F::Coeff, field: &F, links: &mut L) {
        for (row, slot) in self.slots.iter_mut().enumerate() {
            if let Some(current) = *slot {
                *slot = field.multiply(current, coeff);
                if slot.is_none() {
                    links.unlink(row);
                }
            }
        }
        self.trim();
    }

    fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &Self,
        coeff: F::Coeff,
        field: &F,
        links: &mut L,
    ) {
        self.grow_to(other.slots.len());
        for (row, other_coeff) in other.slots.iter().enumerate() {
            let scaled = other_coeff.and_then(|c| field.multiply(c, coeff));
            self.accumulate(row, scaled, field, links);
        }
        self.trim();
    }

    fn reorder(&mut self, row_map: &[usize], _field: &F) {
        let cells: Vec<_> = self
            .slots
            .drain(..)
            .enumerate()
            .filter_map(|(row, slot)| {
                slot.map(|coeff| Cell {
                    row: remap_row(row_map, row),
                    coeff,
                })
            })
            .collect();
        if let Some(len) = cells.iter().map(|cell| cell.row + 1).max() {
            self.grow_to(len);
        }
        for cell in cells {
            self.slots[cell.row] = Some(cell.coeff);
        }
    }
}
