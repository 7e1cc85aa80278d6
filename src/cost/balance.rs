//! Workload balance across the tours of a solution.

use serde::{Deserialize, Serialize};

use super::{cached_or_fresh, CostDelegate};
use crate::config::{BalanceConfig, PenaltyConfig};
use crate::error::CostError;
use crate::models::{NodeId, Solution, Tour, TourEdit, TourSequence};
use crate::moves::{Insertion, Move, MoveKind, PathRelinkingEdit, Removal, Shift, TwoOpt};

/// How the spread of a list of tour costs is measured.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::DeviationMeasure;
///
/// let costs = [1.0, 2.0, 3.0, 6.0];
/// assert_eq!(DeviationMeasure::MaxAbsDev.measure(&costs), 3.0);
/// assert_eq!(DeviationMeasure::MaxMinGap.measure(&costs), 5.0);
/// assert_eq!(DeviationMeasure::Variance.measure(&[]), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationMeasure {
    /// Largest absolute deviation from the mean.
    MaxAbsDev,
    /// Mean absolute deviation from the mean.
    AvgAbsDev,
    /// Population standard deviation.
    StdDev,
    /// Population variance.
    Variance,
    /// Largest cost.
    Max,
    /// Smallest cost.
    Min,
    /// Largest cost minus smallest cost.
    MaxMinGap,
}

impl DeviationMeasure {
    /// Spread of `values`; 0 for an empty list.
    pub fn measure(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        match self {
            DeviationMeasure::MaxAbsDev => values
                .iter()
                .map(|v| (v - mean).abs())
                .fold(0.0, f64::max),
            DeviationMeasure::AvgAbsDev => {
                values.iter().map(|v| (v - mean).abs()).sum::<f64>() / n
            }
            DeviationMeasure::StdDev => variance(values, mean).sqrt(),
            DeviationMeasure::Variance => variance(values, mean),
            DeviationMeasure::Max => max,
            DeviationMeasure::Min => min,
            DeviationMeasure::MaxMinGap => max - min,
        }
    }
}

fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

/// Scores a solution by how evenly its tour costs are spread.
///
/// Tour-level evaluations are those of the wrapped delegate. Solution-level
/// objectives and move improvements are taken over the list of tour costs:
/// the deviation alone, or `sum + weight * deviation` when a penalty weight
/// is configured. Insertions keep the wrapped delegate's improvement unless
/// [`BalanceConfig::penalize_insertions`] is set.
///
/// # Examples
///
/// ```
/// use u_route_cost::config::BalanceConfig;
/// use u_route_cost::cost::{BalanceDelegate, CostDelegate, DeviationMeasure, DistanceDelegate};
/// use u_route_cost::distance::DistanceMatrix;
/// use u_route_cost::models::{Instance, Node, Resource, Solution, Tour};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 3.0, 4.0, 0.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
/// let mut solution = Solution::new(&instance);
/// solution.add_tour(Tour::from_nodes(&instance, 0, &[0, 2, 1]).unwrap());
/// solution.add_tour(Tour::from_nodes(&instance, 0, &[0, 1]).unwrap());
///
/// let balance = BalanceDelegate::new(
///     DistanceDelegate::new(),
///     BalanceConfig::new(DeviationMeasure::MaxMinGap),
/// );
/// assert_eq!(balance.objective(&solution, true).unwrap(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct BalanceDelegate<D> {
    inner: D,
    config: BalanceConfig,
}

impl<D: CostDelegate> BalanceDelegate<D> {
    /// Wraps `inner` with the given balance settings.
    pub fn new(inner: D, config: BalanceConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped delegate.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Balance settings.
    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Objective value for a list of tour costs.
    pub fn score(&self, costs: &[f64]) -> f64 {
        let deviation = self.config.measure.measure(costs);
        match self.config.penalty_weight {
            Some(weight) => costs.iter().sum::<f64>() + weight * deviation,
            None => deviation,
        }
    }

    fn tour_costs(&self, solution: &Solution<'_>) -> Result<Vec<f64>, CostError> {
        solution
            .tours()
            .iter()
            .map(|tour| cached_or_fresh(&self.inner, tour))
            .collect()
    }
}

impl<D: CostDelegate> CostDelegate for BalanceDelegate<D> {
    fn name(&self) -> &'static str {
        "BalanceDelegate"
    }

    fn penalty(&self) -> PenaltyConfig {
        self.inner.penalty()
    }

    fn set_penalty(&self, config: PenaltyConfig) {
        self.inner.set_penalty(config);
    }

    fn evaluate_tour(&self, tour: &Tour<'_>) -> Result<f64, CostError> {
        self.inner.evaluate_tour(tour)
    }

    fn recompute_from(
        &self,
        tour: &mut Tour<'_>,
        from: Option<NodeId>,
    ) -> Result<f64, CostError> {
        self.inner.recompute_from(tour, from)
    }

    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError> {
        self.inner.evaluate_sequence(seq)
    }

    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        self.inner.evaluate_detour(tour, pred, node, succ, is_removal)
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        self.inner.is_insertion_sequence_dependent()
    }

    fn objective(&self, solution: &Solution<'_>, recompute: bool) -> Result<f64, CostError> {
        let costs = if recompute {
            solution
                .tours()
                .iter()
                .map(|tour| self.inner.evaluate_tour(tour))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            solution.tours().iter().map(|tour| tour.total_cost()).collect()
        };
        Ok(self.score(&costs))
    }

    fn evaluate_move(&self, solution: &Solution<'_>, mv: &mut Move) -> Result<f64, CostError> {
        let inner = self.inner.evaluate_move(solution, mv)?;
        if matches!(mv.kind(), MoveKind::Insertion(_)) && !self.config.penalize_insertions {
            return Ok(inner);
        }
        let mut costs = self.tour_costs(solution)?;
        let before = self.score(&costs);
        costs[mv.tour()] -= inner;
        let improvement = before - self.score(&costs);
        tracing::trace!(%mv, inner, improvement, "balanced move");
        mv.set_improvement(improvement);
        Ok(improvement)
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        self.inner.evaluate_insertion(tour, ins)
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        self.inner.evaluate_removal(tour, rem)
    }

    fn evaluate_two_opt(&self, tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        self.inner.evaluate_two_opt(tour, two_opt)
    }

    fn evaluate_shift(&self, tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        self.inner.evaluate_shift(tour, shift)
    }

    fn evaluate_path_relinking(
        &self,
        tour: &Tour<'_>,
        edit: &PathRelinkingEdit,
    ) -> Result<f64, CostError> {
        self.inner.evaluate_path_relinking(tour, edit)
    }

    fn on_tour_edited(&self, tour: &mut Tour<'_>, edit: &TourEdit) -> Result<(), CostError> {
        self.inner.on_tour_edited(tour, edit)
    }

    fn on_node_frozen(&self, tour: &mut Tour<'_>, node: NodeId) -> Result<(), CostError> {
        self.inner.on_node_frozen(tour, node)
    }
}
