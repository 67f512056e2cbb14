//! Incremental column reduction of a boundary matrix.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use log::{debug, trace};

use super::{column_of_face, Bar, Barcode, PivotIndex, ReductionStrategy};
use crate::columns::Column;
use crate::fields::FieldOperators;
use crate::matrices::ColumnStore;
use crate::PersmatError;

/// Persistence pairing of the columns of a matrix, maintained under insertions and removals of
/// the last column.
///
/// Columns `0..next_unreduced` are reduced; the rest are pending until the next
/// [`reduce`](Self::reduce).
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    strategy: ReductionStrategy,
    pivots: PivotIndex,
    /// Keyed by birth column.
    bars: BTreeMap<usize, Bar>,
    next_unreduced: usize,
}

impl Pairing {
    pub fn new(strategy: ReductionStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn strategy(&self) -> ReductionStrategy {
        self.strategy
    }

    pub fn pivots(&self) -> &PivotIndex {
        &self.pivots
    }

    pub fn barcode(&self) -> Barcode {
        Barcode::from_sorted(self.bars.values().copied().collect())
    }

    /// Reduces every pending column.
    pub(crate) fn reduce<F, C>(
        &mut self,
        store: &mut ColumnStore<F, C>,
        face_ids: &[usize],
    ) -> Result<(), PersmatError>
    where
        F: FieldOperators,
        C: Column<F>,
    {
        let end = store.len();
        if self.next_unreduced >= end {
            return Ok(());
        }

        let mut pending: Vec<usize> = (self.next_unreduced..end).collect();
        if self.strategy == ReductionStrategy::Clearing {
            // Stable, so columns of equal dimension stay in filtration order
            pending.sort_by_key(|&column| Reverse(store.dimension(column)));
        }
        debug!(
            "Reducing {} pending columns ({:?})",
            pending.len(),
            self.strategy
        );

        for column in pending {
            // Cleared births, and columns reduced before an earlier batch failed
            if self.bars.contains_key(&column) || self.pivots.pivot_of(column).is_some() {
                continue;
            }
            self.reduce_column(store, column, face_ids)?;
        }
        self.next_unreduced = end;
        Ok(())
    }

    fn reduce_column<F, C>(
        &mut self,
        store: &mut ColumnStore<F, C>,
        column: usize,
        face_ids: &[usize],
    ) -> Result<(), PersmatError>
    where
        F: FieldOperators,
        C: Column<F>,
    {
        loop {
            let Some(pivot) = store.pivot(column) else {
                let dimension = store.dimension(column);
                trace!("Column {column} is positive");
                self.bars.insert(
                    column,
                    Bar {
                        birth: column,
                        death: None,
                        dimension,
                    },
                );
                return Ok(());
            };

            let Some(owner) = self.pivots.column_of(pivot) else {
                trace!("Column {column} is negative with pivot {pivot}");
                self.pivots.insert(pivot, column);
                let birth = column_of_face(face_ids, pivot);
                self.pair(store, birth, column);
                return Ok(());
            };

            let target_value = store
                .pivot_value(column)
                .expect("Column with a pivot has a pivot value");
            let owner_value = store
                .pivot_value(owner)
                .expect("Owner of a pivot has a pivot value");
            let field = &store.field;
            let owner_inverse = field
                .inverse(owner_value)
                .ok_or(PersmatError::NonInvertiblePivot { column: owner, row: pivot })?;
            let factor = field.multiply(field.additive_inverse(target_value), owner_inverse);
            store.multiply_source_and_add_to(factor, owner, column);
        }
    }

    fn pair<F, C>(&mut self, store: &mut ColumnStore<F, C>, birth: usize, death: usize)
    where
        F: FieldOperators,
        C: Column<F>,
    {
        match self.bars.get_mut(&birth) {
            Some(bar) => bar.death = Some(death),
            None => {
                // Birth is still pending; clearing lets us skip its reduction
                if self.strategy == ReductionStrategy::Clearing && birth >= self.next_unreduced {
                    store.clear(birth);
                }
                let dimension = store.dimension(birth);
                self.bars.insert(
                    birth,
                    Bar {
                        birth,
                        death: Some(death),
                        dimension,
                    },
                );
            }
        }
    }

    /// Undoes the contribution of the last column, which has just been removed.
    /// `face_ids` must no longer contain its face.
    ///
    /// The column may lie past the reduced range and still be paired, when a batch failed after
    /// reducing it.
    pub(crate) fn remove_last(&mut self, column: usize, face_ids: &[usize]) {
        self.next_unreduced = self.next_unreduced.min(column);

        match self.pivots.remove_column(column) {
            Some(pivot) => {
                let birth = column_of_face(face_ids, pivot);
                if let Some(bar) = self.bars.get_mut(&birth) {
                    bar.death = None;
                }
                trace!("Reopened the bar born at {birth}");
            }
            None => {
                self.bars.remove(&column);
            }
        }
    }
}
