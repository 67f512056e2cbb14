//! Persistence pairing of boundary matrices.
//!
//! The columns of a [`BoundaryMatrix`](crate::matrices::BoundaryMatrix) are reduced in place,
//! incrementally: every request for a barcode reduces only the columns inserted since the previous
//! one, and removing the last column undoes its contribution.
//! Includes the standard algorithm as well as the clearing algorithm.

mod chain;
mod pairing;

pub use chain::{ChainColumn, ChainPairing};
pub use pairing::Pairing;

use std::cmp::Reverse;
use std::hash::Hash;

use log::warn;
use ordered_float::NotNan;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::PersmatError;

/// Order in which pending columns are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ReductionStrategy {
    /// Left to right.
    Standard,
    /// By decreasing dimension, zeroing the birth column of every new pair.
    #[default]
    Clearing,
    /// Left to right, into a separate basis of [`ChainColumn`]s.
    /// Boundary columns are never modified.
    Chain,
}

/// Column holding face `face_id`, given the face ids of the columns in order.
pub(crate) fn column_of_face(face_ids: &[usize], face_id: usize) -> usize {
    face_ids.binary_search(&face_id).unwrap_or_else(|insertion| {
        warn!("Row {face_id} is not the id of any face");
        insertion
    })
}

// ======== Bars and diagrams ==================================

/// An interval of the barcode, in column indices.
/// `death` is [`None`] for an essential (infinite) bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bar {
    pub birth: usize,
    pub death: Option<usize>,
    pub dimension: usize,
}

impl Bar {
    pub fn is_essential(&self) -> bool {
        self.death.is_none()
    }
}

/// A persistence diagram, as obtained from the barcode.
#[derive(Debug, Clone)]
pub struct Diagram<T> {
    /// The unpaired or essential columns (infinite bars).
    pub essential: FxHashSet<T>,
    /// The paired columns (finite bars), stored as (birth, death) pairs.
    pub pairings: FxHashSet<(T, T)>,
}

impl<T: Eq + Hash> PartialEq for Diagram<T> {
    fn eq(&self, other: &Self) -> bool {
        self.essential == other.essential && self.pairings == other.pairings
    }
}

impl<T: Eq + Hash> Eq for Diagram<T> {}

pub trait FiltrationT: Ord + Copy {}

impl FiltrationT for NotNan<f32> {}
impl FiltrationT for NotNan<f64> {}
impl FiltrationT for usize {}
impl FiltrationT for isize {}
impl FiltrationT for () {}
impl<T> FiltrationT for Reverse<T> where T: FiltrationT {}

/// A bar whose endpoints have been mapped to filtration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilteredBar<FT: FiltrationT> {
    pub birth: FT,
    pub death: Option<FT>,
    pub dimension: usize,
}

impl<FT: FiltrationT> FilteredBar<FT> {
    /// Born and killed at the same filtration value.
    pub fn is_trivial(&self) -> bool {
        self.death == Some(self.birth)
    }
}

/// The bars of a matrix, sorted by birth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Barcode {
    bars: Vec<Bar>,
}

impl Barcode {
    pub(crate) fn from_sorted(bars: Vec<Bar>) -> Self {
        debug_assert!(bars.windows(2).all(|pair| pair[0].birth < pair[1].birth));
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub fn essential(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter().filter(|bar| bar.is_essential())
    }

    pub fn finite(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter().filter(|bar| !bar.is_essential())
    }

    pub fn in_dimension(&self, dimension: usize) -> impl Iterator<Item = &Bar> {
        self.bars
            .iter()
            .filter(move |bar| bar.dimension == dimension)
    }

    /// Number of essential bars in each dimension, up to the largest such dimension.
    pub fn betti_numbers(&self) -> Vec<usize> {
        let mut betti = Vec::new();
        for bar in self.essential() {
            if betti.len() <= bar.dimension {
                betti.resize(bar.dimension + 1, 0);
            }
            betti[bar.dimension] += 1;
        }
        betti
    }

    pub fn diagram(&self) -> Diagram<usize> {
        Diagram {
            essential: self.essential().map(|bar| bar.birth).collect(),
            pairings: self
                .bars
                .iter()
                .filter_map(|bar| bar.death.map(|death| (bar.birth, death)))
                .collect(),
        }
    }

    /// Maps the column indices of every bar to filtration values.
    pub fn with_filtration<FT, G>(&self, filtration: G) -> Result<Vec<FilteredBar<FT>>, PersmatError>
    where
        FT: FiltrationT,
        G: Fn(usize) -> Result<FT, PersmatError>,
    {
        self.bars
            .iter()
            .map(|bar| {
                Ok(FilteredBar {
                    birth: filtration(bar.birth)?,
                    death: bar.death.map(&filtration).transpose()?,
                    dimension: bar.dimension,
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Barcode {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

// ======== Pivot ownership ====================================

/// Which column owns which pivot row, in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotIndex {
    pivot_to_column: FxHashMap<usize, usize>,
    column_to_pivot: FxHashMap<usize, usize>,
}

impl PivotIndex {
    pub fn insert(&mut self, pivot: usize, column: usize) {
        debug_assert!(
            !self.pivot_to_column.contains_key(&pivot),
            "pivot {pivot} is already owned"
        );
        self.pivot_to_column.insert(pivot, column);
        self.column_to_pivot.insert(column, pivot);
    }

    pub fn column_of(&self, pivot: usize) -> Option<usize> {
        self.pivot_to_column.get(&pivot).copied()
    }

    pub fn pivot_of(&self, column: usize) -> Option<usize> {
        self.column_to_pivot.get(&column).copied()
    }

    /// Forgets the pivot owned by `column`, returning it.
    pub fn remove_column(&mut self, column: usize) -> Option<usize> {
        let pivot = self.column_to_pivot.remove(&column)?;
        self.pivot_to_column.remove(&pivot);
        Some(pivot)
    }

    /// Exchanges the pivots owned by two columns.
    pub fn reassign_pivot(&mut self, a: usize, b: usize) {
        let pivot_a = self.column_to_pivot.remove(&a);
        let pivot_b = self.column_to_pivot.remove(&b);
        if let Some(pivot) = pivot_a {
            self.column_to_pivot.insert(b, pivot);
            self.pivot_to_column.insert(pivot, b);
        }
        if let Some(pivot) = pivot_b {
            self.column_to_pivot.insert(a, pivot);
            self.pivot_to_column.insert(pivot, a);
        }
    }

    pub fn len(&self) -> usize {
        self.pivot_to_column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivot_to_column.is_empty()
    }

    pub fn clear(&mut self) {
        self.pivot_to_column.clear();
        self.column_to_pivot.clear();
    }
}
