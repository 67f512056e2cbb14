//! Boundary matrices of filtered complexes.
//!
//! A [`BoundaryMatrix`] is a stack of columns, one per face, inserted in filtration order and
//! removed in reverse.
//! It optionally maintains a row table ([`RowAccess`]), lazily applied row swaps
//! ([`SwapTracker`]) and the persistence pairing of its columns.

use std::borrow::Cow;
use std::fmt::Write;

use itertools::Itertools;
use log::{debug, trace, warn};

use crate::columns::{Cell, Column, SparseColumn};
use crate::fields::{FieldOperators, Z2};
use crate::reduction::{Barcode, ChainColumn, ChainPairing, Pairing, ReductionStrategy};
use crate::PersmatError;

mod dimensions;
mod rows;
mod swaps;


pub use dimensions::DimensionTracker;
pub use rows::{ColumnRowLinks, RowAccess};
pub use swaps::SwapTracker;

// ======== Boundary entries ===================================

/// Anything that can be read as one entry of a boundary.
/// Entries whose coefficient normalises to zero produce [`None`] and are dropped.
pub trait IntoBoundaryEntry<F: FieldOperators> {
    fn into_cell(self, field: &F) -> Option<Cell<F::Coeff>>;
}

/// A bare row, with coefficient one.
impl<F: FieldOperators> IntoBoundaryEntry<F> for usize {
    fn into_cell(self, field: &F) -> Option<Cell<F::Coeff>> {
        Some(Cell::new(self, field.one()))
    }
}

impl<F: FieldOperators> IntoBoundaryEntry<F> for &usize {
    fn into_cell(self, field: &F) -> Option<Cell<F::Coeff>> {
        Some(Cell::new(*self, field.one()))
    }
}

impl<F: FieldOperators> IntoBoundaryEntry<F> for (usize, u64) {
    fn into_cell(self, field: &F) -> Option<Cell<F::Coeff>> {
        field.coefficient(self.1).map(|coeff| Cell::new(self.0, coeff))
    }
}

impl<F: FieldOperators> IntoBoundaryEntry<F> for (usize, i64) {
    fn into_cell(self, field: &F) -> Option<Cell<F::Coeff>> {
        field
            .signed_coefficient(self.1)
            .map(|coeff| Cell::new(self.0, coeff))
    }
}

impl<F: FieldOperators> IntoBoundaryEntry<F> for Cell<F::Coeff> {
    fn into_cell(self, _field: &F) -> Option<Cell<F::Coeff>> {
        Some(self)
    }
}

// ======== Options ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixOptions {
    pub row_access: bool,
    /// Empty trailing rows are dropped from the row table.
    pub removable_rows: bool,
    pub row_swaps: bool,
    pub barcode: bool,
    pub reduction: ReductionStrategy,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            row_access: false,
            removable_rows: false,
            row_swaps: false,
            barcode: true,
            reduction: ReductionStrategy::default(),
        }
    }
}

impl MatrixOptions {
    pub fn with_row_access(mut self, removable_rows: bool) -> Self {
        self.row_access = true;
        self.removable_rows = removable_rows;
        self
    }

    pub fn with_row_swaps(mut self) -> Self {
        self.row_swaps = true;
        self
    }

    pub fn without_barcode(mut self) -> Self {
        self.barcode = false;
        self
    }

    pub fn with_reduction(mut self, reduction: ReductionStrategy) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn validate<F: FieldOperators, C: Column<F>>(&self) -> Result<(), PersmatError> {
        if self.row_access && !C::SUPPORTS_ROW_ACCESS {
            return Err(PersmatError::InvalidConfiguration(
                "this column type cannot maintain row access".to_owned(),
            ));
        }
        if self.removable_rows && !self.row_access {
            return Err(PersmatError::InvalidConfiguration(
                "removable rows require row access".to_owned(),
            ));
        }
        if self.row_swaps && self.barcode {
            return Err(PersmatError::InvalidConfiguration(
                "row swaps invalidate the barcode; disable barcode tracking to swap rows"
                    .to_owned(),
            ));
        }
        Ok(())
    }
}

// ======== Results ============================================

/// One non-zero cell of a row, as seen from the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEntry<C> {
    pub column: usize,
    pub coeff: C,
}

/// What [`BoundaryMatrix::remove_last`] took out of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedColumn {
    pub index: usize,
    pub face_id: usize,
    /// Pivot of the column at removal; the reduced pivot if it had been reduced.
    pub pivot: Option<usize>,
    pub dimension: usize,
}

// ======== Column storage =====================================

/// Columns, the field they live over and the optional row table they report to.
#[derive(Debug, Clone)]
pub(crate) struct ColumnStore<F: FieldOperators, C: Column<F>> {
    pub(crate) field: F,
    columns: Vec<C>,
    rows: Option<RowAccess>,
}

impl<F: FieldOperators, C: Column<F>> ColumnStore<F, C> {
    fn new(field: F, rows: Option<RowAccess>) -> Self {
        Self {
            field,
            columns: Vec::new(),
            rows,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn dimension(&self, index: usize) -> usize {
        self.columns[index].dimension()
    }

    pub(crate) fn pivot(&mut self, index: usize) -> Option<usize> {
        self.columns[index].pivot(&self.field)
    }

    pub(crate) fn pivot_value(&mut self, index: usize) -> Option<F::Coeff> {
        self.columns[index].pivot_value(&self.field)
    }

    pub(crate) fn is_empty(&mut self, index: usize) -> bool {
        self.columns[index].is_empty(&self.field)
    }

    fn coefficient(&mut self, index: usize, row: usize) -> Option<F::Coeff> {
        self.columns[index].coefficient(row, &self.field)
    }

    pub(crate) fn entries(&mut self, index: usize) -> Vec<Cell<F::Coeff>> {
        self.columns[index].entries(&self.field)
    }

    fn content(&mut self, index: usize, length: usize) -> Vec<Option<F::Coeff>> {
        self.columns[index].content(length, &self.field)
    }

    fn push(&mut self, cells: Vec<Cell<F::Coeff>>, dimension: usize) -> usize {
        let index = self.columns.len();
        let mut links = self.rows.as_mut().map(|rows| rows.links(index));
        let column = C::from_cells(cells, dimension, &mut links);
        self.columns.push(column);
        index
    }

    fn pop(&mut self) {
        if let Some(mut column) = self.columns.pop() {
            let index = self.columns.len();
            if let Some(rows) = self.rows.as_mut() {
                column.clear(&mut rows.links(index));
            }
        }
    }

    pub(crate) fn clear(&mut self, index: usize) {
        let mut links = self.rows.as_mut().map(|rows| rows.links(index));
        self.columns[index].clear(&mut links);
    }

    fn clear_row(&mut self, index: usize, row: usize) {
        let mut links = self.rows.as_mut().map(|rows| rows.links(index));
        self.columns[index].clear_row(row, &self.field, &mut links);
    }

    /// Runs `op(target, source)` with the target taken out of the stack, so that the source can be
    /// borrowed alongside it.
    fn combine(
        &mut self,
        source: usize,
        target: usize,
        op: impl FnOnce(&mut C, &C, &F, &mut Option<ColumnRowLinks<'_>>),
    ) {
        let mut column = std::mem::take(&mut self.columns[target]);
        let source_column = if source == target {
            Cow::Owned(column.clone())
        } else {
            Cow::Borrowed(&self.columns[source])
        };
        let mut links = self.rows.as_mut().map(|rows| rows.links(target));
        op(&mut column, &*source_column, &self.field, &mut links);
        self.columns[target] = column;
    }

    pub(crate) fn add_to(&mut self, source: usize, target: usize) {
        self.combine(source, target, |column, source, field, links| {
            column.add(source, field, links)
        });
    }

    /// `target = coeff * target + source`; a zero `coeff` replaces the target by the source.
    pub(crate) fn multiply_target_and_add_to(
        &mut self,
        source: usize,
        coeff: Option<F::Coeff>,
        target: usize,
    ) {
        self.combine(source, target, |column, source, field, links| match coeff {
            Some(coeff) => column.multiply_target_and_add(coeff, source, field, links),
            None => {
                column.clear(links);
                column.add(source, field, links);
            }
        });
    }

    /// `target = target + coeff * source`; a zero `coeff` leaves the target untouched.
    pub(crate) fn multiply_source_and_add_to(
        &mut self,
        coeff: Option<F::Coeff>,
        source: usize,
        target: usize,
    ) {
        let Some(coeff) = coeff else {
            return;
        };
        self.combine(source, target, |column, source, field, links| {
            column.multiply_source_and_add(source, coeff, field, links)
        });
    }

    fn reorder_rows(&mut self, row_map: &[usize]) {
        for column in self.columns.iter_mut() {
            column.reorder(row_map, &self.field);
        }
        if let Some(rows) = self.rows.as_mut() {
            rows.permute(row_map);
        }
    }

    fn swap_columns(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if self.rows.is_some() {
            let rows_of = |cells: Vec<Cell<F::Coeff>>| cells.into_iter().map(|cell| cell.row);
            let rows_a: Vec<usize> = rows_of(self.entries(a)).collect();
            let rows_b: Vec<usize> = rows_of(self.entries(b)).collect();
            if let Some(rows) = self.rows.as_mut() {
                for &row in &rows_a {
                    rows.remove_cell(row, a);
                }
                for &row in &rows_b {
                    rows.remove_cell(row, b);
                }
                for &row in &rows_a {
                    rows.insert_cell(row, b);
                }
                for &row in &rows_b {
                    rows.insert_cell(row, a);
                }
            }
        }
        self.columns.swap(a, b);
    }
}

// ======== Boundary matrix ====================================

/// Boundary matrix of a filtered complex, over the field `F`, storing columns as `C`.
///
/// Every column is tagged with a face id.
/// Face ids are strictly increasing along the stack and boundaries refer to earlier faces by id.
/// When faces are inserted with [`insert_boundary`](Self::insert_boundary) the ids are simply the
/// column indices.
#[derive(Debug, Clone)]
pub struct BoundaryMatrix<F: FieldOperators, C: Column<F> = SparseColumn<F>> {
    store: ColumnStore<F, C>,
    face_ids: Vec<usize>,
    dimensions: DimensionTracker,
    pairing: Option<Pairing>,
    chains: Option<ChainPairing<F, C>>,
    swaps: Option<SwapTracker>,
    options: MatrixOptions,
}

impl<F: FieldOperators, C: Column<F>> BoundaryMatrix<F, C> {
    /// A matrix with the default options: barcode tracking with clearing, nothing else.
    pub fn new(field: F) -> Self {
        Self::build(field, MatrixOptions::default())
    }

    pub fn with_options(field: F, options: MatrixOptions) -> Result<Self, PersmatError> {
        options.validate::<F, C>()?;
        Ok(Self::build(field, options))
    }

    fn build(field: F, options: MatrixOptions) -> Self {
        let rows = options
            .row_access
            .then(|| RowAccess::new(options.removable_rows));
        let chains = options.reduction == ReductionStrategy::Chain;
        Self {
            store: ColumnStore::new(field, rows),
            face_ids: Vec::new(),
            dimensions: DimensionTracker::default(),
            pairing: (options.barcode && !chains).then(|| Pairing::new(options.reduction)),
            chains: (options.barcode && chains).then(ChainPairing::new),
            swaps: options.row_swaps.then(SwapTracker::default),
            options,
        }
    }

    /// Inserts every boundary in order, with the default dimension.
    pub fn from_boundaries<I, B>(
        field: F,
        boundaries: I,
        options: MatrixOptions,
    ) -> Result<Self, PersmatError>
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator,
        B::Item: IntoBoundaryEntry<F>,
    {
        let mut matrix = Self::with_options(field, options)?;
        for boundary in boundaries {
            matrix.insert_boundary(boundary, None);
        }
        Ok(matrix)
    }

    pub fn field(&self) -> &F {
        &self.store.field
    }

    pub fn options(&self) -> &MatrixOptions {
        &self.options
    }

    fn next_face_id(&self) -> usize {
        self.face_ids.last().map_or(0, |id| id + 1)
    }

    fn physical_row(&self, row: usize) -> usize {
        self.swaps.as_ref().map_or(row, |swaps| swaps.row_of(row))
    }

    fn flush_swaps(&mut self) {
        let Some(row_map) = self.swaps.as_mut().and_then(SwapTracker::take_pending) else {
            return;
        };
        trace!(
            "Applying pending row swaps to {} columns",
            self.store.len()
        );
        self.store.reorder_rows(&row_map);
    }

    // ======== Insertion and removal ==========================

    /// Appends the boundary of the next face and returns its column index.
    ///
    /// Rows must be strictly increasing and refer to earlier faces.
    /// `dimension` defaults to the number of entries minus one, or `0` for an empty boundary.
    pub fn insert_boundary<B>(&mut self, boundary: B, dimension: Option<usize>) -> usize
    where
        B: IntoIterator,
        B::Item: IntoBoundaryEntry<F>,
    {
        let face_id = self.next_face_id();
        self.insert_boundary_with_id(face_id, boundary, dimension)
    }

    /// As [`insert_boundary`](Self::insert_boundary), for a face with an explicit id.
    pub fn insert_boundary_with_id<B>(
        &mut self,
        face_id: usize,
        boundary: B,
        dimension: Option<usize>,
    ) -> usize
    where
        B: IntoIterator,
        B::Item: IntoBoundaryEntry<F>,
    {
        let mut entry_count = 0usize;
        let cells: Vec<Cell<F::Coeff>> = boundary
            .into_iter()
            .inspect(|_| entry_count += 1)
            .filter_map(|entry| entry.into_cell(&self.store.field))
            .collect();
        debug_assert!(
            cells.windows(2).all(|pair| pair[0].row < pair[1].row),
            "boundary rows must be strictly increasing"
        );
        debug_assert!(
            self.face_ids.last().map_or(true, |&last| last < face_id),
            "face ids must be strictly increasing"
        );
        debug_assert!(
            cells.last().map_or(true, |cell| cell.row < face_id),
            "a boundary can only refer to earlier faces"
        );
        let dimension = dimension.unwrap_or(entry_count.saturating_sub(1));

        self.flush_swaps();
        if let Some(swaps) = self.swaps.as_mut() {
            swaps.ensure_index(face_id);
        }
        if let Some(rows) = self.store.rows.as_mut() {
            if !rows.is_removable() {
                rows.ensure_rows(face_id + 1);
            }
        }

        let index = self.store.push(cells, dimension);
        self.face_ids.push(face_id);
        self.dimensions.update_up(dimension);
        trace!("Inserted face {face_id} as column {index} (dimension {dimension})");
        index
    }

    /// Removes the last inserted column and undoes its contribution to the barcode.
    /// [`None`] on an empty matrix.
    pub fn remove_last(&mut self) -> Option<RemovedColumn> {
        let index = self.store.len().checked_sub(1)?;
        let face_id = self.face_ids[index];
        let dimension = self.store.dimension(index);
        self.dimensions.update_down(dimension);

        let pivot = if self.store.is_empty(index) {
            None
        } else {
            self.flush_swaps();
            self.store.pivot(index)
        };

        self.store.pop();
        self.face_ids.pop();
        let face_row = self.physical_row(face_id);
        if let Some(rows) = self.store.rows.as_mut() {
            rows.erase_row(face_row);
        }
        if let Some(pairing) = self.pairing.as_mut() {
            pairing.remove_last(index, &self.face_ids);
        }
        if let Some(chains) = self.chains.as_mut() {
            chains.remove_last(index);
        }

        debug!("Removed column {index} (face {face_id}, dimension {dimension})");
        Some(RemovedColumn {
            index,
            face_id,
            pivot,
            dimension,
        })
    }

    /// Drops row `row` from the row table if it is empty and rows are removable.
    pub fn erase_row(&mut self, row: usize) {
        let row = self.physical_row(row);
        if let Some(rows) = self.store.rows.as_mut() {
            rows.erase_row(row);
        }
    }

    /// Empties the matrix, keeping its field and options.
    pub fn reset(&mut self) {
        let field = self.store.field.clone();
        *self = Self::build(field, self.options);
    }

    // ======== Access =========================================

    /// Column `index`, with pending swaps applied.
    ///
    /// Queries on a [`Column`] take `&mut self` so that lazy strategies can consolidate; clone the
    /// column to query it, or use [`get_column_entries`](Self::get_column_entries) and
    /// [`get_pivot`](Self::get_pivot).
    pub fn get_column(&mut self, index: usize) -> &C {
        self.flush_swaps();
        &self.store.columns[index]
    }

    pub fn try_get_column(&mut self, index: usize) -> Result<&C, PersmatError> {
        if index >= self.store.len() {
            return Err(PersmatError::NotInDomain);
        }
        Ok(self.get_column(index))
    }

    /// Cells of a column, sorted by row.
    pub fn get_column_entries(&mut self, index: usize) -> Vec<Cell<F::Coeff>> {
        self.flush_swaps();
        self.store.entries(index)
    }

    /// Cells of a row, sorted by column. Requires row access.
    pub fn get_row(&mut self, row: usize) -> Vec<RowEntry<F::Coeff>> {
        debug_assert!(self.store.rows.is_some(), "row access is disabled");
        self.flush_swaps();
        let columns: Vec<usize> = match self.store.rows.as_ref() {
            Some(rows) => rows.row(row).collect(),
            None => {
                warn!("Row {row} requested without row access");
                return Vec::new();
            }
        };
        columns
            .into_iter()
            .filter_map(|column| {
                self.store
                    .coefficient(column, row)
                    .map(|coeff| RowEntry { column, coeff })
            })
            .collect()
    }

    /// The row table, with pending swaps applied. [`None`] without row access.
    pub fn row_access(&mut self) -> Option<&RowAccess> {
        self.flush_swaps();
        self.store.rows.as_ref()
    }

    pub fn get_pivot(&mut self, index: usize) -> Option<usize> {
        self.flush_swaps();
        self.store.pivot(index)
    }

    pub fn get_number_of_columns(&self) -> usize {
        self.store.len()
    }

    pub fn get_column_dimension(&self, index: usize) -> usize {
        self.store.dimension(index)
    }

    pub fn face_id(&self, index: usize) -> usize {
        self.face_ids[index]
    }

    /// Column holding face `face_id`, if any.
    pub fn column_of_face(&self, face_id: usize) -> Option<usize> {
        self.face_ids.binary_search(&face_id).ok()
    }

    pub fn max_dimension(&self) -> Option<usize> {
        self.dimensions.max()
    }

    pub fn min_dimension(&self) -> Option<usize> {
        self.dimensions.min()
    }

    // ======== Column arithmetic ==============================
    // None of these check that the result is still a valid boundary matrix.

    /// `target += source`
    pub fn add_to(&mut self, source: usize, target: usize) {
        self.store.add_to(source, target);
    }

    /// `target = coeff * target + source`
    pub fn multiply_target_and_add_to(&mut self, source: usize, coeff: u64, target: usize) {
        let coeff = self.store.field.coefficient(coeff);
        self.store.multiply_target_and_add_to(source, coeff, target);
    }

    /// `target = target + coeff * source`
    pub fn multiply_source_and_add_to(&mut self, coeff: u64, source: usize, target: usize) {
        let coeff = self.store.field.coefficient(coeff);
        self.store.multiply_source_and_add_to(coeff, source, target);
    }

    pub fn zero_cell(&mut self, column: usize, row: usize) {
        let row = self.physical_row(row);
        self.store.clear_row(column, row);
    }

    pub fn zero_column(&mut self, column: usize) {
        self.store.clear(column);
    }

    pub fn is_zero_cell(&mut self, column: usize, row: usize) -> bool {
        let row = self.physical_row(row);
        self.store.coefficient(column, row).is_none()
    }

    pub fn is_zero_column(&mut self, column: usize) -> bool {
        self.store.is_empty(column)
    }

    // ======== Swaps ==========================================

    /// Exchanges two rows. Applied lazily; requires row swaps to be enabled.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        debug_assert!(self.swaps.is_some(), "row swaps are disabled");
        match self.swaps.as_mut() {
            Some(swaps) => swaps.swap_rows(a, b),
            None => warn!("Ignoring swap of rows {a} and {b}: row swaps are disabled"),
        }
    }

    /// Exchanges two columns immediately, keeping the row table in sync.
    pub fn swap_columns(&mut self, a: usize, b: usize) {
        self.flush_swaps();
        self.store.swap_columns(a, b);
    }

    // ======== Persistence ====================================

    /// Reduces every column inserted since the last call and returns the current barcode.
    pub fn barcode(&mut self) -> Result<Barcode, PersmatError> {
        if let Some(chains) = self.chains.as_mut() {
            chains.reduce(&mut self.store, &self.face_ids)?;
            return Ok(chains.barcode());
        }
        let Some(pairing) = self.pairing.as_mut() else {
            return Err(PersmatError::InvalidConfiguration(
                "barcode tracking is disabled".to_owned(),
            ));
        };
        pairing.reduce(&mut self.store, &self.face_ids)?;
        Ok(pairing.barcode())
    }

    /// The chain basis, with [`ReductionStrategy::Chain`]; rows are column indices.
    /// Covers the columns reduced by the last [`barcode`](Self::barcode).
    pub fn chains(&self) -> Option<&[ChainColumn<F, C>]> {
        self.chains.as_ref().map(ChainPairing::chains)
    }

    // ======== Debugging ======================================

    /// Dense textual rendering of the columns, followed by the row table when present.
    pub fn debug_dump(&mut self) -> String {
        self.flush_swaps();
        let length = self.next_face_id();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} columns over characteristic {}",
            self.store.len(),
            self.store.field.characteristic()
        );
        for index in 0..self.store.len() {
            let content = self.store.content(index, length);
            let field = &self.store.field;
            let line = content
                .iter()
                .map(|slot| slot.map_or("-".to_owned(), |coeff| field.value(coeff).to_string()))
                .join(" ");
            let _ = writeln!(out, "{index:>4} | {line}");
        }
        if let Some(rows) = self.store.rows.as_ref() {
            let _ = writeln!(out, "rows:");
            for row in 0..rows.number_of_rows() {
                let _ = writeln!(out, "{row:>4} | {}", rows.row(row).join(" "));
            }
        }
        out
    }
}

/// Z2 boundary matrix with one column per entry of `boundaries` and the default options.
pub fn simple_z2_matrix(boundaries: Vec<Vec<usize>>) -> BoundaryMatrix<Z2> {
    let mut matrix = BoundaryMatrix::new(Z2);
    for boundary in boundaries {
        matrix.insert_boundary(boundary, None);
    }
    matrix
}
