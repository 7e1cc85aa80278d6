//! Cost delegates: full and incremental evaluation of tours and moves.
//!
//! A [`CostDelegate`] prices tours, solutions and candidate moves for one
//! objective. Concrete delegates:
//!
//! - [`DistanceDelegate`]: travelled distance, O(1) triangle deltas
//! - [`WorkingTimeDelegate`]: tour duration under time windows with
//!   delayed departure, O(1) forward-slack deltas for insertions
//! - [`WorkingTimeNoDelayDelegate`]: tour duration without delayed
//!   departure, suffix and segment re-walks
//! - [`LevenshteinDelegate`]: edit distance to a reference solution
//!
//! Decorators wrapping any delegate:
//!
//! - [`BalanceDelegate`]: spread of the tour costs across the solution
//! - [`NoisyDelegate`]: randomly perturbed insertion costs
//!
//! # Cache protocol
//!
//! Evaluations never mutate the tour. After a tour mutation, pass the
//! returned [`TourEdit`] to [`CostDelegate::on_tour_edited`] so that the
//! delegate refreshes the cumulative costs it stores in the tour.

mod balance;
mod distance;
mod levenshtein;
mod no_delay;
mod noisy;
mod working_time;

pub use balance::{BalanceDelegate, DeviationMeasure};
pub use distance::DistanceDelegate;
pub use levenshtein::{levenshtein_distance, LevenshteinDelegate};
pub use no_delay::WorkingTimeNoDelayDelegate;
pub use noisy::NoisyDelegate;
pub use working_time::WorkingTimeDelegate;

use std::fmt::Display;
use std::sync::RwLock;

use crate::config::PenaltyConfig;
use crate::error::{CostError, TourError};
use crate::models::{NodeId, Solution, Tour, TourEdit, TourSequence};
use crate::moves::{
    AtomicEdit, Insertion, Move, MoveKind, PathRelinkingEdit, Removal, Shift, TwoOpt,
};

/// Evaluates the cost of tours and the improvement of moves for one
/// objective.
///
/// Improvements are signed changes of the objective with positive values
/// improving it. Detours are always magnitudes, whatever their direction.
pub trait CostDelegate: Send + Sync {
    /// Short name, used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Current unserved-request penalty.
    fn penalty(&self) -> PenaltyConfig;

    /// Replaces the unserved-request penalty.
    fn set_penalty(&self, config: PenaltyConfig);

    /// Cost of `tour` without writing anything back. Empty tours cost 0.
    fn evaluate_tour(&self, tour: &Tour<'_>) -> Result<f64, CostError>;

    /// Recomputes the cached cumulative costs of `tour` after `from` (from
    /// the first node if `None`), stores the total and returns it.
    fn recompute_from(&self, tour: &mut Tour<'_>, from: Option<NodeId>)
        -> Result<f64, CostError>;

    /// Cost of any tour representation, computed from scratch.
    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError>;

    /// Marginal cost of visiting `node` between `pred` and `succ`.
    ///
    /// With `is_removal` the node is currently visited between them and the
    /// value is what removing it saves; otherwise the node is not visited
    /// and the value is what inserting it costs. Either way the magnitude is
    /// returned and callers negate it as needed.
    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError>;

    /// Whether the cost of an insertion depends on the insertions performed
    /// before it in the same tour, i.e. whether precomputed insertion costs
    /// go stale after an unrelated insertion.
    fn is_insertion_sequence_dependent(&self) -> bool;

    /// Recomputes every cached value of `tour` and returns its cost.
    fn update_tour(&self, tour: &mut Tour<'_>) -> Result<f64, CostError> {
        if tour.is_empty() {
            tour.set_total_cost(0.0);
            return Ok(0.0);
        }
        self.recompute_from(tour, None)
    }

    /// Objective value of `solution` without the penalty, from fresh
    /// evaluations if `recompute`, otherwise from the cached tour totals.
    fn objective(&self, solution: &Solution<'_>, recompute: bool) -> Result<f64, CostError> {
        let mut total = 0.0;
        for tour in solution.tours() {
            total += if recompute {
                self.evaluate_tour(tour)?
            } else {
                tour.total_cost()
            };
        }
        Ok(total)
    }

    /// Objective value of `solution` plus the unserved-request penalty.
    fn evaluate_solution(&self, solution: &Solution<'_>, recompute: bool) -> Result<f64, CostError> {
        Ok(self.objective(solution, recompute)? + self.evaluate_penalty(solution))
    }

    /// Updates every tour of `solution` and returns the penalized objective.
    fn update_solution(&self, solution: &mut Solution<'_>) -> Result<f64, CostError> {
        for idx in 0..solution.num_tours() {
            self.update_tour(solution.tour_mut(idx)?)?;
        }
        self.evaluate_solution(solution, false)
    }

    /// Penalty for the requests left unserved by `solution`.
    fn evaluate_penalty(&self, solution: &Solution<'_>) -> f64 {
        self.penalty().penalty(solution.unserved_count())
    }

    /// Sets the unserved-request penalty to `gamma` times the objective of
    /// the reference `solution`. The objective is evaluated without any
    /// penalty and the new config replaces the old one in a single write.
    fn calibrate_unserved_penalty(
        &self,
        solution: &Solution<'_>,
        gamma: f64,
    ) -> Result<PenaltyConfig, CostError> {
        let objective = self.objective(solution, true)?;
        let config = PenaltyConfig::new(gamma * objective);
        tracing::debug!(
            delegate = self.name(),
            gamma,
            objective,
            weight = config.weight,
            "calibrated unserved penalty"
        );
        self.set_penalty(config);
        Ok(config)
    }

    /// Evaluates `mv` against its tour in `solution`, stores the improvement
    /// in the move and returns it.
    fn evaluate_move(&self, solution: &Solution<'_>, mv: &mut Move) -> Result<f64, CostError> {
        let tour = solution.tour(mv.tour())?;
        let improvement = match mv.kind() {
            MoveKind::Insertion(ins) => self.evaluate_insertion(tour, ins)?,
            MoveKind::Removal(rem) => self.evaluate_removal(tour, rem)?,
            MoveKind::TwoOpt(two_opt) => self.evaluate_two_opt(tour, two_opt)?,
            MoveKind::Shift(shift) => self.evaluate_shift(tour, shift)?,
            MoveKind::PathRelinking(edit) => self.evaluate_path_relinking(tour, edit)?,
        };
        tracing::trace!(delegate = self.name(), %mv, improvement, "evaluated move");
        mv.set_improvement(improvement);
        Ok(improvement)
    }

    /// Improvement of an insertion.
    fn evaluate_insertion(&self, _tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        Err(unsupported_move(self.name(), MoveKind::Insertion(*ins)))
    }

    /// Improvement of a removal.
    fn evaluate_removal(&self, _tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        Err(unsupported_move(self.name(), MoveKind::Removal(*rem)))
    }

    /// Improvement of a 2-opt move.
    fn evaluate_two_opt(&self, _tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        Err(unsupported_move(self.name(), MoveKind::TwoOpt(*two_opt)))
    }

    /// Improvement of a shift move.
    fn evaluate_shift(&self, _tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        Err(unsupported_move(self.name(), MoveKind::Shift(*shift)))
    }

    /// Improvement of a path-relinking script.
    ///
    /// The script is played on a clone of `tour`: every atomic edit is
    /// priced as insertions and removals against the clone as edited so
    /// far, then applied to it. A multi-node insert becomes a chain of
    /// single insertions between the growing predecessor and the original
    /// successor; a substitution is a removal followed by an insertion in
    /// the vacated slot.
    fn evaluate_path_relinking(
        &self,
        tour: &Tour<'_>,
        edit: &PathRelinkingEdit,
    ) -> Result<f64, CostError> {
        let mut shadow = tour.clone();
        shadow.set_auto_updated(true);
        self.update_tour(&mut shadow)?;

        let mut improvement = 0.0;
        for atomic in &edit.edits {
            match atomic {
                AtomicEdit::Insert { after, nodes } => {
                    let succ = shadow.succ(*after).ok_or_else(|| {
                        CostError::InvalidMove(format!("insertion after last node {}", after))
                    })?;
                    let mut pred = *after;
                    for &node in nodes {
                        improvement +=
                            self.evaluate_insertion(&shadow, &Insertion::new(node, pred, succ))?;
                        let report = shadow.insert_after(pred, node)?;
                        self.on_tour_edited(&mut shadow, &report)?;
                        pred = node;
                    }
                }
                AtomicEdit::Delete { node } => {
                    improvement += self.evaluate_removal(&shadow, &Removal { node: *node })?;
                    let report = shadow.remove(*node)?;
                    self.on_tour_edited(&mut shadow, &report)?;
                }
                AtomicEdit::Substitute { node, by } => {
                    let (pred, succ) = neighbours(&shadow, *node)?;
                    improvement += self.evaluate_removal(&shadow, &Removal { node: *node })?;
                    let report = shadow.remove(*node)?;
                    self.on_tour_edited(&mut shadow, &report)?;
                    improvement +=
                        self.evaluate_insertion(&shadow, &Insertion::new(*by, pred, succ))?;
                    let report = shadow.insert_after(pred, *by)?;
                    self.on_tour_edited(&mut shadow, &report)?;
                }
            }
        }
        Ok(improvement)
    }

    // ---- Update hooks ----

    /// Routes a mutation report to the matching hook.
    fn on_tour_edited(&self, tour: &mut Tour<'_>, edit: &TourEdit) -> Result<(), CostError> {
        match edit {
            TourEdit::NodeInserted { pred, node, succ } => {
                self.on_node_inserted(tour, *pred, *node, *succ)
            }
            TourEdit::NodeRemoved { pred, node, succ } => {
                self.on_node_removed(tour, *pred, *node, *succ)
            }
            TourEdit::NodeReplaced {
                pred,
                previous,
                node,
                succ,
            } => self.on_node_replaced(tour, *pred, *previous, *node, *succ),
            TourEdit::NodesSwapped {
                pred,
                first,
                second,
            } => self.on_nodes_swapped(tour, *pred, *first, *second),
            TourEdit::NodeShifted {
                node,
                former_pred,
                forward,
            } => self.on_node_shifted(tour, *node, *former_pred, *forward),
            TourEdit::SubtourRemoved {
                pred,
                removed,
                succ,
            } => self.on_subtour_removed(tour, *pred, removed, *succ),
            TourEdit::SubtourReversed {
                pred,
                first,
                last,
                succ,
            } => self.on_subtour_reversed(tour, *pred, *first, *last, *succ),
            TourEdit::TourInserted {
                pred,
                inserted,
                succ,
            } => self.on_tour_inserted(tour, *pred, inserted, *succ),
            TourEdit::NodeFrozen { node } => self.on_node_frozen(tour, *node),
        }
    }

    /// Recomputes `tour` after `from` if it is auto-updated.
    fn refresh_after(&self, tour: &mut Tour<'_>, from: Option<NodeId>) -> Result<(), CostError> {
        if tour.auto_updated() {
            self.recompute_from(tour, from)?;
        }
        Ok(())
    }

    /// `node` was inserted between `pred` and `succ`.
    fn on_node_inserted(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _node: NodeId,
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// `node` was removed from between `pred` and `succ`.
    fn on_node_removed(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _node: NodeId,
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// `previous` was replaced by `node`.
    fn on_node_replaced(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _previous: NodeId,
        _node: NodeId,
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// `first` and `second` exchanged places.
    fn on_nodes_swapped(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _first: NodeId,
        _second: NodeId,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// `node` was moved away from after `former_pred`.
    fn on_node_shifted(
        &self,
        tour: &mut Tour<'_>,
        node: NodeId,
        former_pred: Option<NodeId>,
        forward: bool,
    ) -> Result<(), CostError> {
        let from = if forward { former_pred } else { tour.pred(node) };
        self.refresh_after(tour, from)
    }

    /// A segment was removed from between `pred` and `succ`.
    fn on_subtour_removed(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _removed: &[NodeId],
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// The segment from `first` to `last` was reversed.
    fn on_subtour_reversed(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _first: NodeId,
        _last: NodeId,
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// A sequence of nodes was inserted between `pred` and `succ`.
    fn on_tour_inserted(
        &self,
        tour: &mut Tour<'_>,
        pred: Option<NodeId>,
        _inserted: &[NodeId],
        _succ: Option<NodeId>,
    ) -> Result<(), CostError> {
        self.refresh_after(tour, pred)
    }

    /// The prefix up to `node` was frozen.
    fn on_node_frozen(&self, tour: &mut Tour<'_>, node: NodeId) -> Result<(), CostError> {
        self.refresh_after(tour, Some(node))
    }
}

/// Thread-safe holder of a [`PenaltyConfig`], swapped as a whole.
#[derive(Debug, Default)]
pub struct PenaltyCell(RwLock<PenaltyConfig>);

impl PenaltyCell {
    /// Creates a cell holding `config`.
    pub fn new(config: PenaltyConfig) -> Self {
        Self(RwLock::new(config))
    }

    /// Current config.
    pub fn get(&self) -> PenaltyConfig {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replaces the config.
    pub fn set(&self, config: PenaltyConfig) {
        match self.0.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }
}

impl Clone for PenaltyCell {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Error for a move variant a delegate has no formula for.
pub(crate) fn unsupported_move(delegate: &'static str, kind: impl Display) -> CostError {
    CostError::UnsupportedMove {
        delegate,
        description: kind.to_string(),
    }
}

/// Predecessor and successor of a visited node that is neither first nor last.
pub(crate) fn neighbours(tour: &Tour<'_>, node: NodeId) -> Result<(NodeId, NodeId), CostError> {
    tour.require(node)?;
    match (tour.pred(node), tour.succ(node)) {
        (Some(pred), Some(succ)) => Ok((pred, succ)),
        _ => Err(CostError::InvalidMove(format!(
            "node {} is at an end of the tour",
            node
        ))),
    }
}

/// Checks that `node` exists in the instance of `tour`.
pub(crate) fn check_known(tour: &dyn TourSequence, node: NodeId) -> Result<(), TourError> {
    if node < tour.instance().num_nodes() {
        Ok(())
    } else {
        Err(TourError::UnknownNode(node))
    }
}

/// Checks that `succ` directly follows `pred` and `node` is not visited.
pub(crate) fn check_insertion_site(
    tour: &dyn TourSequence,
    pred: NodeId,
    node: NodeId,
    succ: NodeId,
) -> Result<(), CostError> {
    check_known(tour, node)?;
    let follows = match tour.as_cached() {
        Some(cached) => {
            if cached.contains(node) {
                return Err(TourError::NodeAlreadyInTour(node).into());
            }
            cached.require(pred)?;
            cached.succ(pred) == Some(succ)
        }
        None => {
            let nodes = tour.nodes();
            if nodes.contains(&node) {
                return Err(TourError::NodeAlreadyInTour(node).into());
            }
            let pos = nodes
                .iter()
                .position(|&n| n == pred)
                .ok_or(TourError::NodeNotInTour(pred))?;
            nodes.get(pos + 1) == Some(&succ)
        }
    };
    if !follows {
        return Err(CostError::InvalidMove(format!(
            "{} does not directly follow {}",
            succ, pred
        )));
    }
    Ok(())
}

/// Checks that `node` is visited directly between `pred` and `succ`.
pub(crate) fn check_removal_site(
    tour: &dyn TourSequence,
    pred: NodeId,
    node: NodeId,
    succ: NodeId,
) -> Result<(), CostError> {
    let nodes = tour.nodes();
    let pos = match tour.as_cached() {
        Some(cached) => cached.require(node)?,
        None => nodes
            .iter()
            .position(|&n| n == node)
            .ok_or(TourError::NodeNotInTour(node))?,
    };
    let between = pos > 0 && nodes[pos - 1] == pred && nodes.get(pos + 1) == Some(&succ);
    if !between {
        return Err(CostError::InvalidMove(format!(
            "{} is not visited between {} and {}",
            node, pred, succ
        )));
    }
    Ok(())
}

/// Cost of `tour`, from its cached total when the schedule is current.
pub(crate) fn cached_or_fresh(
    delegate: &dyn CostDelegate,
    tour: &Tour<'_>,
) -> Result<f64, CostError> {
    if tour.auto_updated() && tour.schedule_is_current() {
        Ok(tour.total_cost())
    } else {
        delegate.evaluate_tour(tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scenario;

    #[test]
    fn test_penalty_cell_swaps_whole_config() {
        let cell = PenaltyCell::default();
        assert_eq!(cell.get(), PenaltyConfig::disabled());
        cell.set(PenaltyConfig::new(3.0));
        assert_eq!(cell.get(), PenaltyConfig::new(3.0));
        assert_eq!(cell.clone().get().weight, 3.0);
    }

    #[test]
    fn test_check_insertion_site() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        assert!(check_insertion_site(&tour, 0, 2, 3).is_ok());
        assert!(matches!(
            check_insertion_site(&tour, 0, 2, 1),
            Err(CostError::InvalidMove(_))
        ));
        assert_eq!(
            check_insertion_site(&tour, 0, 3, 1),
            Err(CostError::Tour(TourError::NodeAlreadyInTour(3)))
        );
    }

    #[test]
    fn test_check_insertion_site_unknown_node() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        assert_eq!(
            check_insertion_site(&tour, 0, 99, 3),
            Err(CostError::Tour(TourError::UnknownNode(99)))
        );
        let simple = crate::models::SimpleTour::new(&inst, 0, vec![0, 3, 1]);
        assert_eq!(
            check_insertion_site(&simple, 0, 4, 3),
            Err(CostError::Tour(TourError::UnknownNode(4)))
        );
    }

    #[test]
    fn test_check_removal_site() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        assert!(check_removal_site(&tour, 0, 2, 3).is_ok());
        assert!(matches!(
            check_removal_site(&tour, 0, 3, 1),
            Err(CostError::InvalidMove(_))
        ));
        assert!(matches!(
            check_removal_site(&tour, 1, 0, 2),
            Err(CostError::InvalidMove(_))
        ));
        let simple = crate::models::SimpleTour::new(&inst, 0, vec![0, 2, 1]);
        assert_eq!(
            check_removal_site(&simple, 0, 3, 1),
            Err(CostError::Tour(TourError::NodeNotInTour(3)))
        );
    }

    #[test]
    fn test_neighbours_rejects_depots() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        assert_eq!(neighbours(&tour, 3), Ok((0, 1)));
        assert!(neighbours(&tour, 0).is_err());
        assert!(neighbours(&tour, 2).is_err());
    }
}
