//! Solution type: one tour per resource plus the unserved requests.

use std::collections::BTreeSet;

use super::{Instance, NodeId, Tour};
use crate::error::TourError;

/// A set of tours over one instance, together with the requests that no
/// tour serves.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::{Instance, Node, Resource, Solution};
/// use u_route_cost::distance::DistanceMatrix;
///
/// let nodes = vec![Node::depot(0, 0.0, 0.0), Node::depot(1, 0.0, 0.0), Node::new(2, 1.0, 1.0, 0.0)];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
///
/// let mut sol = Solution::with_depots(&instance);
/// sol.mark_unserved(2);
/// assert_eq!(sol.num_tours(), 1);
/// assert_eq!(sol.unserved_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Solution<'a> {
    instance: &'a Instance,
    tours: Vec<Tour<'a>>,
    unserved: BTreeSet<NodeId>,
}

impl<'a> Solution<'a> {
    /// Creates a solution without tours.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            tours: Vec::new(),
            unserved: BTreeSet::new(),
        }
    }

    /// Creates a solution with one depot-only tour per resource.
    pub fn with_depots(instance: &'a Instance) -> Self {
        let tours = (0..instance.resources().len())
            .map(|r| Tour::with_depots(instance, r))
            .collect();
        Self {
            instance,
            tours,
            unserved: BTreeSet::new(),
        }
    }

    /// The instance the solution belongs to.
    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    /// Adds a tour and returns its index.
    pub fn add_tour(&mut self, tour: Tour<'a>) -> usize {
        self.tours.push(tour);
        self.tours.len() - 1
    }

    /// All tours.
    pub fn tours(&self) -> &[Tour<'a>] {
        &self.tours
    }

    /// Number of tours.
    pub fn num_tours(&self) -> usize {
        self.tours.len()
    }

    /// The tour with index `idx`.
    pub fn tour(&self, idx: usize) -> Result<&Tour<'a>, TourError> {
        self.tours.get(idx).ok_or(TourError::UnknownTour(idx))
    }

    /// Mutable access to the tour with index `idx`.
    pub fn tour_mut(&mut self, idx: usize) -> Result<&mut Tour<'a>, TourError> {
        self.tours.get_mut(idx).ok_or(TourError::UnknownTour(idx))
    }

    /// Index of the tour visiting `node`.
    pub fn tour_of(&self, node: NodeId) -> Option<usize> {
        self.tours.iter().position(|t| t.contains(node))
    }

    /// Requests not served by any tour.
    pub fn unserved(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.unserved.iter().copied()
    }

    /// Number of unserved requests.
    pub fn unserved_count(&self) -> usize {
        self.unserved.len()
    }

    /// Records `node` as unserved.
    pub fn mark_unserved(&mut self, node: NodeId) {
        self.unserved.insert(node);
    }

    /// Records `node` as served. Returns `false` if it was not unserved.
    pub fn mark_served(&mut self, node: NodeId) -> bool {
        self.unserved.remove(&node)
    }
}
