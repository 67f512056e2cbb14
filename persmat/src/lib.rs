//! Persistence matrices: boundary matrices of filtered complexes, reduced over a field to a barcode.
//!
//! A [`BoundaryMatrix`](matrices::BoundaryMatrix) is a stack of columns.
//! Boundaries are pushed in filtration order with [`insert_boundary`](matrices::BoundaryMatrix::insert_boundary)
//! and the most recent one can be popped again with [`remove_last`](matrices::BoundaryMatrix::remove_last),
//! which keeps the barcode valid.
//!
//! The coefficient field is an explicit context object (see [`fields`]) and the column storage
//! is a generic parameter (see [`columns`]).

pub mod columns;
pub mod fields;
pub mod matrices;
pub mod reduction;

pub use columns::{Cell, Column, DenseColumn, HeapColumn, SetColumn, SparseColumn};
pub use fields::{FieldOperators, MultiField, PrimeField, Z2};
pub use matrices::{BoundaryMatrix, IntoBoundaryEntry, MatrixOptions, RemovedColumn, RowEntry};
pub use reduction::{
    Bar, Barcode, ChainColumn, ChainPairing, Diagram, PivotIndex, ReductionStrategy,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersmatError {
    /// Rejected field or matrix configuration, raised before any matrix work.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The pivot of `column` at `row` has no inverse (only possible over a multi-field).
    #[error("pivot of column {column} at row {row} is not invertible")]
    NonInvertiblePivot { column: usize, row: usize },
    #[error("column index is not in the matrix")]
    NotInDomain,
}
