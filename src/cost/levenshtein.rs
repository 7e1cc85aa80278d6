//! Edit distance to a reference solution.
//!
//! The cost of a tour is the Levenshtein distance between its visiting
//! sequence and the tour of the same resource in a reference solution:
//! the number of single-node insertions, deletions and substitutions that
//! turn one into the other. Path relinking uses it to measure how far a
//! solution still is from its guiding solution.

use std::collections::BTreeMap;

use super::{neighbours, CostDelegate, PenaltyCell};
use crate::config::PenaltyConfig;
use crate::error::CostError;
use crate::models::{NodeId, Solution, Tour, TourSequence};
use crate::moves::{Insertion, MoveKind, Removal, Shift, TwoOpt};

const NAME: &str = "LevenshteinDelegate";

/// Levenshtein distance between two node sequences.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::levenshtein_distance;
///
/// assert_eq!(levenshtein_distance(&[0, 2, 3, 1], &[0, 3, 4, 1]), 2);
/// assert_eq!(levenshtein_distance(&[], &[0, 1]), 2);
/// ```
pub fn levenshtein_distance(reference: &[NodeId], seq: &[NodeId]) -> usize {
    prefix_distances(reference, seq)[seq.len()]
}

/// Distance between `reference` and every prefix of `seq`: entry `k` is
/// the distance to the first `k` nodes.
fn prefix_distances(reference: &[NodeId], seq: &[NodeId]) -> Vec<usize> {
    let mut row: Vec<usize> = (0..=reference.len()).collect();
    let mut out = Vec::with_capacity(seq.len() + 1);
    out.push(reference.len());
    for (k, &node) in seq.iter().enumerate() {
        let mut diag = row[0];
        row[0] = k + 1;
        for (j, &r) in reference.iter().enumerate() {
            let substitution = if r == node { diag } else { diag + 1 };
            let next = substitution.min(row[j] + 1).min(row[j + 1] + 1);
            diag = row[j + 1];
            row[j + 1] = next;
        }
        out.push(row[reference.len()]);
    }
    out
}

/// Edit distance of each tour to the tour of the same resource in a
/// reference solution.
///
/// Resources without a reference tour are compared to the empty sequence.
/// The distance has no incremental form: detours fail with
/// [`CostError::UnsupportedOperation`] and moves are priced by scoring the
/// edited sequence.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::{CostDelegate, LevenshteinDelegate};
/// use u_route_cost::distance::DistanceMatrix;
/// use u_route_cost::models::{Instance, Node, Resource, Solution, Tour};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 1.0, 0.0, 0.0),
///     Node::new(3, 2.0, 0.0, 0.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
///
/// let mut guide = Solution::new(&instance);
/// guide.add_tour(Tour::from_nodes(&instance, 0, &[0, 2, 3, 1]).unwrap());
/// let delegate = LevenshteinDelegate::from_solution(&guide);
///
/// let tour = Tour::from_nodes(&instance, 0, &[0, 3, 1]).unwrap();
/// assert_eq!(delegate.evaluate_tour(&tour).unwrap(), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LevenshteinDelegate {
    reference: BTreeMap<usize, Vec<NodeId>>,
    penalty: PenaltyCell,
}

impl LevenshteinDelegate {
    /// Measures distances to the tours of `reference`.
    pub fn from_solution(reference: &Solution<'_>) -> Self {
        let reference = reference
            .tours()
            .iter()
            .map(|tour| (tour.resource(), tour.nodes().to_vec()))
            .collect();
        Self {
            reference,
            penalty: PenaltyCell::default(),
        }
    }

    /// Reference sequence of `resource`, empty if there is none.
    pub fn reference(&self, resource: usize) -> &[NodeId] {
        self.reference.get(&resource).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of edits separating `solution` from the reference.
    pub fn distance_to(&self, solution: &Solution<'_>) -> usize {
        solution
            .tours()
            .iter()
            .map(|tour| levenshtein_distance(self.reference(tour.resource()), tour.nodes()))
            .sum()
    }

    fn rescored(&self, tour: &Tour<'_>, kind: MoveKind) -> Result<f64, CostError> {
        let before = self.evaluate_tour(tour)?;
        let mut edited = tour.clone();
        kind.apply(&mut edited)?;
        Ok(before - self.evaluate_tour(&edited)?)
    }
}

impl CostDelegate for LevenshteinDelegate {
    fn name(&self) -> &'static str {
        NAME
    }

    fn penalty(&self) -> PenaltyConfig {
        self.penalty.get()
    }

    fn set_penalty(&self, config: PenaltyConfig) {
        self.penalty.set(config);
    }

    fn evaluate_tour(&self, tour: &Tour<'_>) -> Result<f64, CostError> {
        self.evaluate_sequence(tour)
    }

    /// Stores in each node the distance between the reference and the tour
    /// prefix ending at it. The whole row is always recomputed.
    fn recompute_from(
        &self,
        tour: &mut Tour<'_>,
        _from: Option<NodeId>,
    ) -> Result<f64, CostError> {
        if tour.is_empty() {
            tour.set_total_cost(0.0);
            return Ok(0.0);
        }
        let nodes = tour.nodes().to_vec();
        let distances = prefix_distances(self.reference(tour.resource()), &nodes);
        for (node, distance) in nodes.iter().zip(&distances[1..]) {
            tour.set_cumulative_cost(*node, *distance as f64);
        }
        let total = distances[nodes.len()] as f64;
        tour.set_total_cost(total);
        Ok(total)
    }

    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError> {
        if seq.nodes().is_empty() {
            return Ok(0.0);
        }
        Ok(levenshtein_distance(self.reference(seq.resource()), seq.nodes()) as f64)
    }

    fn evaluate_detour(
        &self,
        _tour: &dyn TourSequence,
        _pred: NodeId,
        _node: NodeId,
        _succ: NodeId,
        _is_removal: bool,
    ) -> Result<f64, CostError> {
        Err(CostError::UnsupportedOperation {
            delegate: NAME,
            operation: "evaluate_detour",
        })
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        true
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        self.rescored(tour, MoveKind::Insertion(*ins))
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        neighbours(tour, rem.node)?;
        self.rescored(tour, MoveKind::Removal(*rem))
    }

    fn evaluate_two_opt(&self, tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        self.rescored(tour, MoveKind::TwoOpt(*two_opt))
    }

    fn evaluate_shift(&self, tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        self.rescored(tour, MoveKind::Shift(*shift))
    }
}
