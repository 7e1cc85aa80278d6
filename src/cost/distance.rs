//! Travelled distance.
//!
//! # Algorithm
//!
//! Every move changes a constant number of edges, so its improvement is the
//! length of the removed edges minus the length of the added ones. 2-opt
//! assumes a symmetric distance matrix: the reversed segment keeps its
//! length.
//!
//! # Complexity
//!
//! O(1) per move, O(n) per full evaluation.

use super::{check_insertion_site, check_known, neighbours, CostDelegate, PenaltyCell};
use crate::config::PenaltyConfig;
use crate::error::{CostError, TourError};
use crate::models::{Instance, NodeId, Tour, TourSequence};
use crate::moves::{Detour, Insertion, InsertionSite, Removal, Shift, TwoOpt};

const NAME: &str = "DistanceDelegate";

/// Total distance travelled along the tour.
///
/// The cumulative cost of a node is the distance travelled from the first
/// node up to it.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::{CostDelegate, DistanceDelegate};
/// use u_route_cost::distance::DistanceMatrix;
/// use u_route_cost::models::{Instance, Node, Resource, Tour};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 3.0, 4.0, 0.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
/// let tour = Tour::with_depots(&instance, 0);
///
/// let delegate = DistanceDelegate::new();
/// assert_eq!(delegate.evaluate_detour(&tour, 0, 2, 1, false).unwrap(), 10.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DistanceDelegate {
    penalty: PenaltyCell,
}

impl DistanceDelegate {
    /// Creates a delegate without unserved penalty.
    pub fn new() -> Self {
        Self::default()
    }

    fn site_cost(instance: &Instance, site: &InsertionSite) -> f64 {
        triangle(instance, site.pred, site.node, site.succ)
    }
}

fn triangle(instance: &Instance, pred: NodeId, node: NodeId, succ: NodeId) -> f64 {
    instance.distance(pred, node) + instance.distance(node, succ) - instance.distance(pred, succ)
}

impl CostDelegate for DistanceDelegate {
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

    fn recompute_from(
        &self,
        tour: &mut Tour<'_>,
        from: Option<NodeId>,
    ) -> Result<f64, CostError> {
        let start = match from {
            Some(node) => tour.require(node)?,
            None => 0,
        };
        let nodes = tour.nodes().to_vec();
        if let (Some(&first), None) = (nodes.first(), from) {
            tour.set_cumulative_cost(first, 0.0);
        }
        for w in nodes[start..].windows(2) {
            let cost = tour.cumulative_cost(w[0]) + tour.instance().distance(w[0], w[1]);
            tour.set_cumulative_cost(w[1], cost);
        }
        let total = nodes.last().map_or(0.0, |&last| tour.cumulative_cost(last));
        tour.set_total_cost(total);
        Ok(total)
    }

    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError> {
        let instance = seq.instance();
        Ok(seq
            .nodes()
            .windows(2)
            .map(|w| instance.distance(w[0], w[1]))
            .sum())
    }

    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        _is_removal: bool,
    ) -> Result<f64, CostError> {
        for id in [pred, node, succ] {
            check_known(tour, id)?;
        }
        Ok(triangle(tour.instance(), pred, node, succ))
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        false
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        check_insertion_site(tour, ins.pred, ins.node, ins.succ)?;
        let instance = tour.instance();
        let detour = match ins.detour(tour)? {
            Detour::Single(site) => Self::site_cost(instance, &site),
            Detour::Adjacent {
                pred,
                first,
                second,
                succ,
            } => {
                instance.distance(pred, first)
                    + instance.distance(first, second)
                    + instance.distance(second, succ)
                    - instance.distance(pred, succ)
            }
            Detour::Disjoint(a, b) => Self::site_cost(instance, &a) + Self::site_cost(instance, &b),
        };
        Ok(-detour)
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        let (pred, succ) = neighbours(tour, rem.node)?;
        Ok(triangle(tour.instance(), pred, rem.node, succ))
    }

    fn evaluate_two_opt(&self, tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        let (i, j) = (two_opt.first, two_opt.second);
        if tour.require(i)? >= tour.require(j)? {
            return Err(CostError::InvalidMove(format!(
                "2-opt edge {} must come before {}",
                i, j
            )));
        }
        let m = tour.succ(i).ok_or(TourError::NodeNotInTour(i))?;
        let n = tour
            .succ(j)
            .ok_or_else(|| CostError::InvalidMove(format!("2-opt edge after last node {}", j)))?;
        let d = |a, b| tour.instance().distance(a, b);
        Ok(d(i, m) + d(j, n) - d(i, j) - d(m, n))
    }

    fn evaluate_shift(&self, tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        let node = shift.node;
        let (pred, succ) = neighbours(tour, node)?;
        tour.require(shift.new_succ)?;
        if shift.new_succ == succ {
            return Ok(0.0);
        }
        if shift.new_succ == node {
            return Err(CostError::InvalidMove(format!("cannot shift {} before itself", node)));
        }
        let new_pred = tour.pred(shift.new_succ).ok_or_else(|| {
            CostError::InvalidMove(format!("cannot shift before first node {}", shift.new_succ))
        })?;
        let instance = tour.instance();
        Ok(triangle(instance, pred, node, succ) - triangle(instance, new_pred, node, shift.new_succ))
    }
}
