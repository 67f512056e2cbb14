//! Complexes shared by the integration tests.
#![allow(dead_code)]

use itertools::Itertools;
use persmat::{BoundaryMatrix, Column, FieldOperators, MatrixOptions};
use rustc_hash::FxHashMap;

/// Signed boundaries of a complex in filtration order, with the dimension of every face.
#[derive(Debug, Clone)]
pub struct Complex {
    pub boundaries: Vec<Vec<(usize, i64)>>,
    pub dimensions: Vec<usize>,
}

impl Complex {
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Matrix holding the first `count` faces.
    pub fn prefix_matrix<F, C>(&self, field: F, options: MatrixOptions, count: usize) -> BoundaryMatrix<F, C>
    where
        F: FieldOperators,
        C: Column<F>,
    {
        let mut matrix = BoundaryMatrix::with_options(field, options).unwrap();
        for idx in 0..count {
            self.insert_face(&mut matrix, idx);
        }
        matrix
    }

    pub fn matrix<F, C>(&self, field: F, options: MatrixOptions) -> BoundaryMatrix<F, C>
    where
        F: FieldOperators,
        C: Column<F>,
    {
        self.prefix_matrix(field, options, self.len())
    }

    pub fn insert_face<F, C>(&self, matrix: &mut BoundaryMatrix<F, C>, idx: usize) -> usize
    where
        F: FieldOperators,
        C: Column<F>,
    {
        matrix.insert_boundary(self.boundaries[idx].iter().copied(), Some(self.dimensions[idx]))
    }

    /// Sum of `inc(a, b) * inc(b, c)` over the faces `b` of every face `a`, per `c`.
    /// Zero everywhere for a chain complex.
    pub fn max_incidence_defect(&self) -> i64 {
        let mut worst = 0;
        for boundary in &self.boundaries {
            let mut totals: FxHashMap<usize, i64> = FxHashMap::default();
            for &(b, inc_ab) in boundary {
                for &(c, inc_bc) in &self.boundaries[b] {
                    *totals.entry(c).or_default() += inc_ab * inc_bc;
                }
            }
            worst = totals.values().map(|v| v.abs()).fold(worst, i64::max);
        }
        worst
    }
}

/// Assigns indices to faces sorted by (dimension, key), then resolves every boundary.
fn index_faces<K>(faces: Vec<(usize, K, Vec<(K, i64)>)>) -> Complex
where
    K: Ord + Clone + std::hash::Hash + Eq,
{
    let mut faces = faces;
    faces.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    let index: FxHashMap<K, usize> = faces
        .iter()
        .enumerate()
        .map(|(idx, face)| (face.1.clone(), idx))
        .collect();

    let mut boundaries = Vec::with_capacity(faces.len());
    let mut dimensions = Vec::with_capacity(faces.len());
    for (dimension, _, boundary) in faces {
        let mut merged: FxHashMap<usize, i64> = FxHashMap::default();
        for (face, coeff) in boundary {
            *merged.entry(index[&face]).or_default() += coeff;
        }
        let boundary = merged
            .into_iter()
            .filter(|&(_, coeff)| coeff != 0)
            .sorted()
            .collect();
        boundaries.push(boundary);
        dimensions.push(dimension);
    }
    Complex {
        boundaries,
        dimensions,
    }
}

/// Cubical complex of a grid with `sizes[i]` unit cubes along axis `i`.
///
/// Cells use doubled coordinates: a coordinate is odd exactly along the axes the cell spans.
/// With `periodic` the grid wraps around in every direction, giving a torus.
pub fn cubical_grid(sizes: &[usize], periodic: bool) -> Complex {
    let extents: Vec<usize> = sizes
        .iter()
        .map(|&size| if periodic { 2 * size } else { 2 * size + 1 })
        .collect();

    let faces = extents
        .iter()
        .map(|&extent| 0..extent)
        .multi_cartesian_product()
        .map(|cell| {
            let mut boundary = Vec::new();
            let mut spanned = 0;
            for axis in 0..cell.len() {
                if cell[axis] % 2 == 0 {
                    continue;
                }
                let sign = if spanned % 2 == 0 { 1 } else { -1 };
                let mut lower = cell.clone();
                lower[axis] -= 1;
                let mut upper = cell.clone();
                upper[axis] = (cell[axis] + 1) % extents[axis];
                boundary.push((upper, sign));
                boundary.push((lower, -sign));
                spanned += 1;
            }
            (spanned, cell, boundary)
        })
        .collect();

    index_faces(faces)
}

/// Simplicial complex on six vertices: every vertex, the edges selected by `edge_mask` or needed by
/// a selected triangle, and the triangles selected by `triangle_mask`.
/// Masks follow the lexicographic order of edges and triangles.
pub fn random_complex(edge_mask: &[bool], triangle_mask: &[bool]) -> Complex {
    const VERTICES: usize = 6;
    let triangles: Vec<Vec<usize>> = (0..VERTICES)
        .combinations(3)
        .zip(triangle_mask)
        .filter(|(_, keep)| **keep)
        .map(|(triangle, _)| triangle)
        .collect();
    let mut edges: Vec<Vec<usize>> = (0..VERTICES)
        .combinations(2)
        .zip(edge_mask)
        .filter(|(_, keep)| **keep)
        .map(|(edge, _)| edge)
        .collect();
    for triangle in &triangles {
        edges.extend(triangle.iter().copied().combinations(2));
    }

    let simplices = (0..VERTICES)
        .map(|v| vec![v])
        .chain(edges.into_iter().unique())
        .chain(triangles);

    let faces = simplices
        .map(|simplex| {
            let dimension = simplex.len() - 1;
            let boundary = if dimension == 0 {
                Vec::new()
            } else {
                (0..simplex.len())
                    .map(|skip| {
                        let face: Vec<usize> = simplex
                            .iter()
                            .enumerate()
                            .filter(|&(i, _)| i != skip)
                            .map(|(_, &v)| v)
                            .collect();
                        (face, if skip % 2 == 0 { 1 } else { -1 })
                    })
                    .collect()
            };
            (dimension, simplex, boundary)
        })
        .collect();

    index_faces(faces)
}
