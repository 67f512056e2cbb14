//! Column storage strategies.
//!
//! Every strategy implements [`Column`] with the same observable semantics: the cells of a column
//! are sorted by row, have unique rows and never hold a zero coefficient.
//! They differ in how they trade memory for the cost of additions and pivot queries.
//!
//! Mutating operations report every cell that appears or disappears to a [`RowLinks`] sink, which
//! is how the matrix keeps its row table in sync.
//! Pass [`NoRowLinks`] when no row table exists.

use std::fmt::Debug;

use crate::fields::FieldOperators;

mod dense;
mod heap;
mod set;
mod sparse;

pub use dense::DenseColumn;
pub use heap::HeapColumn;
pub use set::SetColumn;
pub use sparse::SparseColumn;

/// A non-zero entry of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell<C> {
    pub row: usize,
    pub coeff: C,
}

impl<C> Cell<C> {
    pub fn new(row: usize, coeff: C) -> Self {
        Self { row, coeff }
    }
}

impl<C> From<(usize, C)> for Cell<C> {
    fn from((row, coeff): (usize, C)) -> Self {
        Self { row, coeff }
    }
}

impl<C> From<Cell<C>> for (usize, C) {
    fn from(cell: Cell<C>) -> Self {
        (cell.row, cell.coeff)
    }
}

/// Receives row-link updates from a column that is changing its cells.
pub trait RowLinks {
    /// A cell has appeared in `row`.
    fn link(&mut self, row: usize);
    /// The cell in `row` has disappeared.
    fn unlink(&mut self, row: usize);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoRowLinks;

impl RowLinks for NoRowLinks {
    fn link(&mut self, _row: usize) {}
    fn unlink(&mut self, _row: usize) {}
}

impl<L: RowLinks> RowLinks for Option<L> {
    fn link(&mut self, row: usize) {
        if let Some(links) = self {
            links.link(row)
        }
    }

    fn unlink(&mut self, row: usize) {
        if let Some(links) = self {
            links.unlink(row)
        }
    }
}

/// A column of a persistence matrix over the field `F`.
///
/// Queries take `&mut self` so that lazy strategies (see [`HeapColumn`]) may consolidate
/// before answering.
pub trait Column<F: FieldOperators>: Default + Clone + Debug {
    /// Whether this strategy reports its cell changes through [`RowLinks`].
    /// Matrices refuse to enable row access for strategies that do not.
    const SUPPORTS_ROW_ACCESS: bool = true;

    /// Builds a column from cells with strictly increasing rows and non-zero coefficients.
    fn from_cells<L: RowLinks + ?Sized>(
        cells: Vec<Cell<F::Coeff>>,
        dimension: usize,
        links: &mut L,
    ) -> Self;

    fn dimension(&self) -> usize;

    /// Largest row holding a non-zero cell.
    fn pivot(&mut self, field: &F) -> Option<usize>;

    fn pivot_value(&mut self, field: &F) -> Option<F::Coeff>;

    fn coefficient(&mut self, row: usize, field: &F) -> Option<F::Coeff>;

    fn is_non_zero(&mut self, row: usize, field: &F) -> bool {
        self.coefficient(row, field).is_some()
    }

    fn is_empty(&mut self, field: &F) -> bool {
        self.pivot(field).is_none()
    }

    /// The non-zero cells, sorted by row.
    fn entries(&mut self, field: &F) -> Vec<Cell<F::Coeff>>;

    /// Dense rendering of rows `0..length`; cells at or beyond `length` are omitted.
    fn content(&mut self, length: usize, field: &F) -> Vec<Option<F::Coeff>> {
        let mut content = vec![None; length];
        for cell in self.entries(field) {
            if let Some(slot) = content.get_mut(cell.row) {
                *slot = Some(cell.coeff);
            }
        }
        content
    }

    fn clear<L: RowLinks + ?Sized>(&mut self, links: &mut L);

    fn clear_row<L: RowLinks + ?Sized>(&mut self, row: usize, field: &F, links: &mut L);

    /// `self += other`
    fn add<L: RowLinks + ?Sized>(&mut self, other: &Self, field: &F, links: &mut L);

    /// `self *= coeff`; over a multi-field some cells may vanish.
    fn scale<L: RowLinks + ?Sized>(&mut self, coeff: F::Coeff, field: &F, links: &mut L);

    /// `self = coeff * self + other`
    fn multiply_target_and_add<L: RowLinks + ?Sized>(
        &mut self,
        coeff: F::Coeff,
        other: &Self,
        field: &F,
        links: &mut L,
    ) {
        if !field.is_one(coeff) {
            self.scale(coeff, field, links);
        }
        self.add(other, field, links);
    }

    /// `self = self + coeff * other`
    fn multiply_source_and_add<L: RowLinks + ?Sized>(
        &mut self,
        other: &Self,
        coeff: F::Coeff,
        field: &F,
        links: &mut L,
    ) {
        if field.is_one(coeff) {
            self.add(other, field, links);
            return;
        }
        let mut scaled = other.clone();
        scaled.scale(coeff, field, &mut NoRowLinks);
        self.add(&scaled, field, links);
    }

    /// Renames every row `r` to `row_map[r]`; rows beyond the map keep their index.
    /// The row table is permuted separately by the matrix.
    fn reorder(&mut self, row_map: &[usize], field: &F);
}

pub(crate) fn remap_row(row_map: &[usize], row: usize) -> usize {
    row_map.get(row).copied().unwrap_or(row)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    /// Records links so tests can check that columns report exactly their cell changes.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingLinks {
        pub(crate) rows: BTreeSet<usize>,
    }

    impl RowLinks for RecordingLinks {
        fn link(&mut self, row: usize) {
            assert!(self.rows.insert(row), "row {row} linked twice");
        }

        fn unlink(&mut self, row: usize) {
            assert!(self.rows.remove(&row), "row {row} unlinked but never linked");
        }
    }

    fn z2_cells(rows: &[usize]) -> Vec<Cell<crate::fields::Z2>> {
        rows.iter()
            .map(|&row| Cell::new(row, crate::fields::Z2))
            .collect()
    }

    fn zp_cells(
        field: &crate::fields::PrimeField,
        cells: &[(usize, u64)],
    ) -> Vec<Cell<std::num::NonZeroU64>> {
        cells
            .iter()
            .map(|&(row, value)| Cell::new(row, field.coefficient(value).unwrap()))
            .collect()
    }

    fn rows_of<C>(cells: &[Cell<C>]) -> Vec<usize> {
        cells.iter().map(|cell| cell.row).collect()
    }

    macro_rules! column_strategy_tests {
        ($name:ident, $column:ident) => {
            mod $name {
                use std::collections::BTreeSet;
                use std::num::NonZeroU64;

                use super::*;
                use crate::columns::$column;
                use crate::fields::{FieldOperators, MultiField, PrimeField, Z2};

                #[test]
                fn z2_addition_cancels_shared_rows() {
                    let mut links = RecordingLinks::default();
                    let mut a = <$column<Z2> as Column<Z2>>::from_cells(
                        z2_cells(&[2, 4]),
                        1,
                        &mut links,
                    );
                    let b = <$column<Z2> as Column<Z2>>::from_cells(
                        z2_cells(&[2, 6]),
                        1,
                        &mut NoRowLinks,
                    );
                    a.add(&b, &Z2, &mut links);
                    assert_eq!(rows_of(&a.entries(&Z2)), vec![4, 6]);
                    assert_eq!(a.pivot(&Z2), Some(6));
                    assert_eq!(a.dimension(), 1);
                    assert!(!a.is_non_zero(2, &Z2));
                    assert!(a.is_non_zero(4, &Z2));
                    if <$column<Z2> as Column<Z2>>::SUPPORTS_ROW_ACCESS {
                        assert_eq!(links.rows, BTreeSet::from([4, 6]));
                    }
                }

                #[test]
                fn adding_a_column_to_itself_in_z2_empties_it() {
                    let mut a = <$column<Z2> as Column<Z2>>::from_cells(
                        z2_cells(&[0, 3, 5]),
                        2,
                        &mut NoRowLinks,
                    );
                    let copy = a.clone();
                    a.add(&copy, &Z2, &mut NoRowLinks);
                    assert!(a.is_empty(&Z2));
                    assert_eq!(a.pivot(&Z2), None);
                    assert_eq!(a.pivot_value(&Z2), None);
                }

                #[test]
                fn zp_arithmetic_keeps_sorted_unique_non_zero_cells() {
                    let z5 = PrimeField::new(5).unwrap();
                    let mut links = RecordingLinks::default();
                    let mut a = <$column<PrimeField> as Column<PrimeField>>::from_cells(
                        zp_cells(&z5, &[(0, 1), (1, 4), (3, 2)]),
                        2,
                        &mut links,
                    );
                    let b = <$column<PrimeField> as Column<PrimeField>>::from_cells(
                        zp_cells(&z5, &[(1, 1), (2, 3), (3, 1)]),
                        2,
                        &mut NoRowLinks,
                    );
                    a.add(&b, &z5, &mut links);
                    let entries = a.entries(&z5);
                    assert_eq!(entries, zp_cells(&z5, &[(0, 1), (2, 3), (3, 3)]));
                    assert_eq!(a.pivot_value(&z5), z5.coefficient(3));

                    // a = 2 * a + b
                    a.multiply_target_and_add(z5.coefficient(2).unwrap(), &b, &z5, &mut links);
                    assert_eq!(
                        a.entries(&z5),
                        zp_cells(&z5, &[(0, 2), (1, 1), (2, 4), (3, 2)])
                    );

                    // a = a + 3 * b
                    a.multiply_source_and_add(&b, z5.coefficient(3).unwrap(), &z5, &mut links);
                    assert_eq!(a.entries(&z5), zp_cells(&z5, &[(0, 2), (1, 4), (2, 3)]));
                    assert_eq!(a.pivot(&z5), Some(2));

                    if <$column<PrimeField> as Column<PrimeField>>::SUPPORTS_ROW_ACCESS {
                        assert_eq!(links.rows, BTreeSet::from([0, 1, 2]));
                    }
                }

                #[test]
                fn scaling_over_a_multi_field_drops_zero_divisor_products() {
                    let field = MultiField::new(2, 3).unwrap();
                    let mut links = RecordingLinks::default();
                    let cells = vec![
                        Cell::new(1, field.coefficient(2).unwrap()),
                        Cell::new(4, field.coefficient(5).unwrap()),
                    ];
                    let mut a =
                        <$column<MultiField> as Column<MultiField>>::from_cells(cells, 1, &mut links);
                    a.scale(field.coefficient(3).unwrap(), &field, &mut links);
                    assert_eq!(a.entries(&field), vec![Cell::new(4, NonZeroU64::new(3).unwrap())]);
                    if <$column<MultiField> as Column<MultiField>>::SUPPORTS_ROW_ACCESS {
                        assert_eq!(links.rows, BTreeSet::from([4]));
                    }
                }

                #[test]
                fn clearing_rows_and_columns() {
                    let mut links = RecordingLinks::default();
                    let mut a = <$column<Z2> as Column<Z2>>::from_cells(
                        z2_cells(&[1, 2, 7]),
                        2,
                        &mut links,
                    );
                    a.clear_row(7, &Z2, &mut links);
                    assert_eq!(a.pivot(&Z2), Some(2));
                    a.clear_row(5, &Z2, &mut links);
                    assert_eq!(rows_of(&a.entries(&Z2)), vec![1, 2]);
                    assert_eq!(a.content(3, &Z2), vec![None, Some(Z2), Some(Z2)]);
                    assert_eq!(a.content(2, &Z2), vec![None, Some(Z2)]);
                    a.clear(&mut links);
                    assert!(a.is_empty(&Z2));
                    assert!(links.rows.is_empty());
                    assert_eq!(a.dimension(), 2);
                }

                #[test]
                fn reorder_renames_rows_and_resorts() {
                    let z3 = PrimeField::new(3).unwrap();
                    let mut a = <$column<PrimeField> as Column<PrimeField>>::from_cells(
                        zp_cells(&z3, &[(0, 1), (2, 2)]),
                        1,
                        &mut NoRowLinks,
                    );
                    a.reorder(&[3, 1, 0, 2], &z3);
                    assert_eq!(a.entries(&z3), zp_cells(&z3, &[(0, 2), (3, 1)]));
                    assert_eq!(a.pivot(&z3), Some(3));
                    assert_eq!(a.coefficient(0, &z3), z3.coefficient(2));
                }

                #[test]
                fn default_column_is_empty() {
                    let mut a = <$column<Z2> as Default>::default();
                    assert!(a.is_empty(&Z2));
                    assert_eq!(a.dimension(), 0);
                    assert!(a.entries(&Z2).is_empty());
                }
            }
        };
    }

    column_strategy_tests!(dense, DenseColumn);
    column_strategy_tests!(sparse, SparseColumn);
    column_strategy_tests!(set, SetColumn);
    column_strategy_tests!(heap, HeapColumn);
}
