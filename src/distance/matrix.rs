//! Dense node-to-node distance matrix.

use crate::models::{Node, NodeId};

/// Distances between every pair of nodes, indexed by [`NodeId`] and stored
/// row by row.
///
/// The O(1) insertion formulas of the cost delegates assume the triangle
/// inequality; [`satisfies_triangle_inequality`](Self::satisfies_triangle_inequality)
/// checks it for hand-written matrices.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::Node;
/// use u_route_cost::distance::DistanceMatrix;
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 3.0, 4.0, 5.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// assert!((dm.get(0, 2) - 5.0).abs() < 1e-10);
/// assert_eq!(dm.max_distance(), 5.0);
/// assert!(dm.satisfies_triangle_inequality(1e-9));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// A matrix for `size` nodes with every distance set to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Euclidean distances between node coordinates. Node `i` of the slice
    /// gets row and column `i`.
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut dm = Self::new(nodes.len());
        for (i, a) in nodes.iter().enumerate() {
            for (j, b) in nodes.iter().enumerate().skip(i + 1) {
                let d = a.distance_to(b);
                dm.set(i, j, d);
                dm.set(j, i, d);
            }
        }
        dm
    }

    /// A matrix from `size * size` row-major distances.
    ///
    /// Returns `None` if the length does not match or a distance is negative
    /// or not finite.
    pub fn from_data(size: usize, data: Vec<f64>) -> Option<Self> {
        let valid = data.len() == size * size && data.iter().all(|d| d.is_finite() && *d >= 0.0);
        valid.then_some(Self { data, size })
    }

    /// Distance from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either node is out of bounds.
    pub fn get(&self, from: NodeId, to: NodeId) -> f64 {
        self.data[from * self.size + to]
    }

    /// Overrides the distance from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either node is out of bounds.
    pub fn set(&mut self, from: NodeId, to: NodeId, distance: f64) {
        self.data[from * self.size + to] = distance;
    }

    /// Number of nodes covered.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest distance in the matrix, 0 when empty.
    pub fn max_distance(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Returns `true` if `get(i, j)` and `get(j, i)` differ by at most `tol`
    /// for every pair.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.size).all(|i| {
            (i + 1..self.size).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol)
        })
    }

    /// Returns `true` if no detour through a third node is shorter than the
    /// direct distance by more than `tol`.
    pub fn satisfies_triangle_inequality(&self, tol: f64) -> bool {
        let n = self.size;
        (0..n).all(|i| {
            (0..n).all(|j| {
                (0..n).all(|k| self.get(i, j) <= self.get(i, k) + self.get(k, j) + tol)
            })
        })
    }
}
