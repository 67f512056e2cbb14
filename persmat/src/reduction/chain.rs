//! Chain columns, and the pairing that maintains a basis of them.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use log::{debug, trace, warn};

use super::{column_of_face, Bar, Barcode, PivotIndex};
use crate::columns::{Cell, Column, NoRowLinks, RowLinks};
use crate::fields::FieldOperators;
use crate::matrices::ColumnStore;
use crate::PersmatError;

/// A column of a chain-complex basis.
///
/// Unlike a boundary column, its pivot is an identity it keeps rather than its largest row.
/// When an addition cancels the cell in its pivot row, it trades pivots with the column it was
/// added to, keeping every pivot owned by exactly one chain.
#[derive(Debug, Clone)]
pub struct ChainColumn<F: FieldOperators, C: Column<F>> {
    column: C,
    index: usize,
    pivot: Option<usize>,
    paired: Option<usize>,
    _field: PhantomData<F>,
}

impl<F: FieldOperators, C: Column<F>> ChainColumn<F, C> {
    /// A chain whose pivot is its largest row.
    pub fn new<L: RowLinks + ?Sized>(
        index: usize,
        chain: Vec<Cell<F::Coeff>>,
        dimension: usize,
        links: &mut L,
    ) -> Self {
        let pivot = chain.last().map(|cell| cell.row);
        Self {
            column: C::from_cells(chain, dimension, links),
            index,
            pivot,
            paired: None,
            _field: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn column(&self) -> &C {
        &self.column
    }

    pub fn column_mut(&mut self) -> &mut C {
        &mut self.column
    }

    pub fn pivot(&self) -> Option<usize> {
        self.pivot
    }

    pub fn pivot_value(&mut self, field: &F) -> Option<F::Coeff> {
        let pivot = self.pivot?;
        self.column.coefficient(pivot, field)
    }

    pub fn paired_chain(&self) -> Option<usize> {
        self.paired
    }

    pub fn is_paired(&self) -> bool {
        self.paired.is_some()
    }

    pub fn assign_paired_chain(&mut self, other: usize) {
        self.paired = Some(other);
    }

    pub fn unassign_paired_chain(&mut self) {
        self.paired = None;
    }

    fn trade_pivot_if_lost(&mut self, other: &mut Self, field: &F, pivots: &mut PivotIndex) {
        let Some(pivot) = self.pivot else {
            return;
        };
        if self.column.is_non_zero(pivot, field) {
            return;
        }
        pivots.reassign_pivot(self.index, other.index);
        std::mem::swap(&mut self.pivot, &mut other.pivot);
    }

    /// `self += other`
    pub fn add<L: RowLinks + ?Sized>(
        &mut self,
        other: &mut Self,
        field: &F,
        pivots: &mut PivotIndex,
        links: &mut L,
    ) {
        self.column.add(&other.column, field, links);
        self.trade_pivot_if_lost(other, field, pivots);
    }

    /// `self = coeff * self + other`
    pub fn multiply_target_and_add<L: RowLinks + ?Sized>(
        &mut self,
        coeff: F::Coeff,
        other: &mut Self,
        field: &F,
        pivots: &mut PivotIndex,
        links: &mut L,
    ) {
        self.column
            .multiply_target_and_add(coeff, &other.column, field, links);
        self.trade_pivot_if_lost(other, field, pivots);
    }

    /// `self = self + coeff * other`
    pub fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &mut Self,
        coeff: F::Coeff,
        field: &F,
        pivots: &mut PivotIndex,
        links: &mut L,
    ) {
        self.column
            .multiply_source_and_add(&other.column, coeff, field, links);
        self.trade_pivot_if_lost(other, field, pivots);
    }
}

// ======== Chain pairing ======================================

/// Persistence pairing read off a basis of chains, one per reduced column.
///
/// The chain of column `i` has pivot `i`.
/// An unpaired chain is a cycle, born at its pivot.
/// Paired chains come in twos: a cycle `g` that has become a boundary, and the later chain `h`
/// with `∂h = g` that killed it.
#[derive(Debug, Clone)]
pub struct ChainPairing<F: FieldOperators, C: Column<F>> {
    chains: Vec<ChainColumn<F, C>>,
    pivots: PivotIndex,
    /// Keyed by birth column.
    bars: BTreeMap<usize, Bar>,
}

impl<F: FieldOperators, C: Column<F>> Default for ChainPairing<F, C> {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            pivots: PivotIndex::default(),
            bars: BTreeMap::new(),
        }
    }
}

impl<F: FieldOperators, C: Column<F>> ChainPairing<F, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chains of the columns reduced so far, indexed by column; rows are column indices.
    pub fn chains(&self) -> &[ChainColumn<F, C>] {
        &self.chains
    }

    pub fn pivots(&self) -> &PivotIndex {
        &self.pivots
    }

    pub fn barcode(&self) -> Barcode {
        Barcode::from_sorted(self.bars.values().copied().collect())
    }

    /// Adds a chain for every column inserted since the last call, in filtration order.
    /// The boundary columns are only read.
    pub(crate) fn reduce(
        &mut self,
        store: &mut ColumnStore<F, C>,
        face_ids: &[usize],
    ) -> Result<(), PersmatError> {
        let end = store.len();
        if self.chains.len() < end {
            debug!(
                "Reducing {} pending columns into chains",
                end - self.chains.len()
            );
        }
        while self.chains.len() < end {
            let index = self.chains.len();
            let boundary = store
                .entries(index)
                .into_iter()
                .map(|cell| Cell::new(column_of_face(face_ids, cell.row), cell.coeff))
                .collect();
            let dimension = store.dimension(index);
            self.insert_chain(&store.field, index, boundary, dimension)?;
        }
        Ok(())
    }

    /// Nothing is modified when this fails.
    fn insert_chain(
        &mut self,
        field: &F,
        index: usize,
        boundary: Vec<Cell<F::Coeff>>,
        dimension: usize,
    ) -> Result<(), PersmatError> {
        // Write the boundary in the chain basis: it is a sum of unpaired cycles and of boundaries
        let mut residual = C::from_cells(boundary, dimension.saturating_sub(1), &mut NoRowLinks);
        let mut cycles = Vec::new();
        let mut killers = Vec::new();
        while let Some(pivot) = residual.pivot(field) {
            let owner = self
                .pivots
                .column_of(pivot)
                .expect("Every reduced column owns the pivot of its chain");
            let chain = &mut self.chains[owner];
            let value = residual
                .pivot_value(field)
                .expect("Column with a pivot has a pivot value");
            let chain_value = chain
                .pivot_value(field)
                .expect("Chains keep a non-zero pivot");
            let coeff = field
                .inverse(chain_value)
                .and_then(|inverse| field.multiply(value, inverse))
                .ok_or(PersmatError::NonInvertiblePivot {
                    column: owner,
                    row: pivot,
                })?;
            residual.multiply_source_and_add(
                chain.column(),
                field.additive_inverse(coeff),
                field,
                &mut NoRowLinks,
            );
            match chain.paired_chain() {
                None => cycles.push((owner, coeff)),
                Some(partner) if partner > owner => killers.push((partner, coeff)),
                Some(partner) => {
                    warn!("Boundary of column {index} runs along chain {owner}, which kills {partner}")
                }
            }
        }

        // Pivots decrease along the decomposition, so the first cycle is the youngest
        let youngest = match cycles.first() {
            Some(&(owner, coeff)) => {
                let inverse = field
                    .inverse(coeff)
                    .ok_or(PersmatError::NonInvertiblePivot {
                        column: index,
                        row: owner,
                    })?;
                Some((owner, inverse))
            }
            None => None,
        };

        // Cancel the boundaries, leaving `∂chain` as a combination of cycles
        let mut chain = ChainColumn::new(
            index,
            vec![Cell::new(index, field.one())],
            dimension,
            &mut NoRowLinks,
        );
        for (partner, coeff) in killers {
            chain.multiply_source_and_add(
                &mut self.chains[partner],
                field.additive_inverse(coeff),
                field,
                &mut self.pivots,
                &mut NoRowLinks,
            );
        }

        match youngest {
            None => {
                trace!("Chain {index} is a new cycle");
                self.bars.insert(
                    index,
                    Bar {
                        birth: index,
                        death: None,
                        dimension,
                    },
                );
            }
            Some((birth, inverse)) => {
                trace!("Chain {index} kills the cycle born at {birth}");
                // The youngest cycle absorbs the others and becomes the boundary of the new chain
                for &(other, coeff) in &cycles[1..] {
                    if let Some(scaled) = field.multiply(coeff, inverse) {
                        let (target, source) = two_mut(&mut self.chains, birth, other);
                        target.multiply_source_and_add(
                            source,
                            scaled,
                            field,
                            &mut self.pivots,
                            &mut NoRowLinks,
                        );
                    }
                }
                chain.column_mut().scale(inverse, field, &mut NoRowLinks);
                chain.assign_paired_chain(birth);
                self.chains[birth].assign_paired_chain(index);
                if let Some(bar) = self.bars.get_mut(&birth) {
                    bar.death = Some(index);
                }
            }
        }

        self.pivots.insert(index, index);
        self.chains.push(chain);
        Ok(())
    }

    /// Drops the chain of the last column, which has just been removed.
    pub(crate) fn remove_last(&mut self, column: usize) {
        if column >= self.chains.len() {
            return;
        }
        debug_assert_eq!(column + 1, self.chains.len(), "only the last chain can be removed");
        let Some(chain) = self.chains.pop() else {
            return;
        };
        self.pivots.remove_column(chain.index());
        match chain.paired_chain() {
            Some(partner) => {
                // What it killed is an unpaired cycle again
                if let Some(cycle) = self.chains.get_mut(partner) {
                    cycle.unassign_paired_chain();
                }
                if let Some(bar) = self.bars.get_mut(&partner) {
                    bar.death = None;
                }
                trace!("Reopened the bar born at {partner}");
            }
            None => {
                self.bars.remove(&column);
            }
        }
    }
}

fn two_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
