//! Randomly perturbed insertion and removal costs.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{unsupported_move, CostDelegate};
use crate::config::{NoiseConfig, PenaltyConfig};
use crate::error::CostError;
use crate::models::{NodeId, Solution, Tour, TourEdit, TourSequence};
use crate::moves::{Insertion, MoveKind, PathRelinkingEdit, Removal, Shift, TwoOpt};

const NAME: &str = "NoisyDelegate";

/// Adds bounded uniform noise to the detours and insertion or removal
/// improvements of the wrapped delegate.
///
/// The noise never flips the sign of a value: non-negative values stay
/// non-negative and negative values stay non-positive. Only meant for
/// randomized construction and repair, so full tour and solution
/// evaluations fail with [`CostError::UnsupportedOperation`].
///
/// # Examples
///
/// ```
/// use u_route_cost::config::NoiseConfig;
/// use u_route_cost::cost::{CostDelegate, DistanceDelegate, NoisyDelegate};
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
/// let noisy = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(2.0), 42);
/// let detour = noisy.evaluate_detour(&tour, 0, 2, 1, false).unwrap();
/// assert!((8.0..=12.0).contains(&detour));
/// ```
#[derive(Debug)]
pub struct NoisyDelegate<D, R = StdRng> {
    inner: D,
    config: NoiseConfig,
    rng: Mutex<R>,
}

impl<D: CostDelegate> NoisyDelegate<D, StdRng> {
    /// Wraps `inner` with a seeded [`StdRng`].
    pub fn with_seed(inner: D, config: NoiseConfig, seed: u64) -> Self {
        Self::new(inner, config, StdRng::seed_from_u64(seed))
    }
}

impl<D: CostDelegate, R: Rng + Send> NoisyDelegate<D, R> {
    /// Wraps `inner`, drawing noise from `rng`.
    pub fn new(inner: D, config: NoiseConfig, rng: R) -> Self {
        Self {
            inner,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// The wrapped delegate.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Noise settings.
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// `value` plus uniform noise in `[-max_noise, max_noise]`, clamped at
    /// zero so that the sign is kept.
    pub fn perturb(&self, value: f64) -> f64 {
        let max = self.config.max_noise;
        if max <= 0.0 {
            return value;
        }
        let noise = {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            rng.random_range(-max..=max)
        };
        if value >= 0.0 {
            (value + noise).max(0.0)
        } else {
            (value + noise).min(0.0)
        }
    }

    fn unsupported(&self, operation: &'static str) -> CostError {
        CostError::UnsupportedOperation {
            delegate: NAME,
            operation,
        }
    }
}

impl<D: CostDelegate, R: Rng + Send> CostDelegate for NoisyDelegate<D, R> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn penalty(&self) -> PenaltyConfig {
        self.inner.penalty()
    }

    fn set_penalty(&self, config: PenaltyConfig) {
        self.inner.set_penalty(config);
    }

    fn evaluate_tour(&self, _tour: &Tour<'_>) -> Result<f64, CostError> {
        Err(self.unsupported("evaluate_tour"))
    }

    fn recompute_from(
        &self,
        _tour: &mut Tour<'_>,
        _from: Option<NodeId>,
    ) -> Result<f64, CostError> {
        Err(self.unsupported("recompute_from"))
    }

    fn evaluate_sequence(&self, _seq: &dyn TourSequence) -> Result<f64, CostError> {
        Err(self.unsupported("evaluate_sequence"))
    }

    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        let detour = self.inner.evaluate_detour(tour, pred, node, succ, is_removal)?;
        Ok(self.perturb(detour))
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        self.inner.is_insertion_sequence_dependent()
    }

    fn evaluate_solution(
        &self,
        _solution: &Solution<'_>,
        _recompute: bool,
    ) -> Result<f64, CostError> {
        Err(self.unsupported("evaluate_solution"))
    }

    fn objective(&self, _solution: &Solution<'_>, _recompute: bool) -> Result<f64, CostError> {
        Err(self.unsupported("objective"))
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        Ok(self.perturb(self.inner.evaluate_insertion(tour, ins)?))
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        Ok(self.perturb(self.inner.evaluate_removal(tour, rem)?))
    }

    fn evaluate_two_opt(&self, _tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        Err(unsupported_move(NAME, MoveKind::TwoOpt(*two_opt)))
    }

    fn evaluate_shift(&self, _tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        Err(unsupported_move(NAME, MoveKind::Shift(*shift)))
    }

    fn evaluate_path_relinking(
        &self,
        _tour: &Tour<'_>,
        edit: &PathRelinkingEdit,
    ) -> Result<f64, CostError> {
        Err(unsupported_move(NAME, MoveKind::PathRelinking(edit.clone())))
    }

    fn on_tour_edited(&self, tour: &mut Tour<'_>, edit: &TourEdit) -> Result<(), CostError> {
        self.inner.on_tour_edited(tour, edit)
    }

    fn refresh_after(&self, tour: &mut Tour<'_>, from: Option<NodeId>) -> Result<(), CostError> {
        self.inner.refresh_after(tour, from)
    }

    fn on_node_frozen(&self, tour: &mut Tour<'_>, node: NodeId) -> Result<(), CostError> {
        self.inner.on_node_frozen(tour, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{DistanceDelegate, WorkingTimeDelegate};
    use crate::models::SimpleTour;
    use crate::moves::{AtomicEdit, Move};
    use crate::testing::scenario;

    #[test]
    fn test_sign_preserved_and_bounded() {
        let noisy = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(25.0), 7);
        let mut rng = StdRng::seed_from_u64(8);
        for i in 0..10_000 {
            let value = if i % 100 == 0 {
                0.0
            } else {
                rng.random_range(-50.0..50.0)
            };
            let noisy_value = noisy.perturb(value);
            if value > 0.0 {
                assert!(noisy_value >= 0.0, "{} became {}", value, noisy_value);
            } else if value < 0.0 {
                assert!(noisy_value <= 0.0, "{} became {}", value, noisy_value);
            } else {
                assert!(noisy_value >= 0.0);
            }
            assert!((noisy_value - value).abs() <= 25.0);
        }
    }

    #[test]
    fn test_zero_noise_is_transparent() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        let noisy =
            NoisyDelegate::with_seed(WorkingTimeDelegate::new(), NoiseConfig::default(), 1);
        assert_eq!(noisy.evaluate_detour(&tour, 0, 2, 3, false), Ok(10.0));
        assert_eq!(
            noisy.evaluate_insertion(&tour, &Insertion::new(2, 3, 1)),
            Ok(-40.0)
        );
    }

    #[test]
    fn test_same_seed_same_noise() {
        let inst = scenario();
        let tour = SimpleTour::new(&inst, 0, vec![0, 3, 1]);
        let a = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(3.0), 99);
        let b = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(3.0), 99);
        for _ in 0..20 {
            let x = a.evaluate_detour(&tour, 0, 2, 3, false).expect("valid");
            let y = b.evaluate_detour(&tour, 0, 2, 3, false).expect("valid");
            assert_eq!(x, y);
            assert!((x - 5.0).abs() <= 3.0);
        }
    }

    #[test]
    fn test_moves_perturbed_through_dispatch() {
        let inst = scenario();
        let mut sol = Solution::new(&inst);
        sol.add_tour(Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid"));
        let noisy = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(1.0), 3);

        // removing A saves 10 + 15 - 20
        let mut mv = Move::removal(0, 2);
        let imp = noisy.evaluate_move(&sol, &mut mv).expect("valid");
        assert!((4.0..=6.0).contains(&imp));
        assert_eq!(mv.improvement(), Some(imp));

        let mut mv = Move::two_opt(0, 0, 3);
        assert!(matches!(
            noisy.evaluate_move(&sol, &mut mv),
            Err(CostError::UnsupportedMove { delegate: NAME, .. })
        ));
        let mut mv = Move::shift(0, 2, 1);
        assert!(noisy.evaluate_move(&sol, &mut mv).is_err());
        let mut mv = Move::path_relinking(0, vec![AtomicEdit::Delete { node: 2 }]);
        assert!(noisy.evaluate_move(&sol, &mut mv).is_err());
    }

    #[test]
    fn test_full_evaluations_fail_fast() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        let noisy = NoisyDelegate::with_seed(DistanceDelegate::new(), NoiseConfig::new(1.0), 3);
        assert_eq!(
            noisy.evaluate_tour(&tour),
            Err(CostError::UnsupportedOperation {
                delegate: NAME,
                operation: "evaluate_tour",
            })
        );
        assert!(noisy.update_tour(&mut tour).is_err());
        assert!(noisy.evaluate_sequence(&tour).is_err());

        let sol = Solution::new(&inst);
        assert!(matches!(
            noisy.evaluate_solution(&sol, true),
            Err(CostError::UnsupportedOperation { .. })
        ));
        assert!(noisy.calibrate_unserved_penalty(&sol, 0.5).is_err());
    }

    #[test]
    fn test_hooks_reach_inner_delegate() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        WorkingTimeDelegate::new()
            .update_tour(&mut tour)
            .expect("valid");
        let noisy =
            NoisyDelegate::with_seed(WorkingTimeDelegate::new(), NoiseConfig::new(5.0), 11);
        let edit = tour.insert_after(0, 2).expect("valid");
        noisy.on_tour_edited(&mut tour, &edit).expect("valid");
        assert_eq!(tour.total_cost(), 55.0);
        assert!(noisy.is_insertion_sequence_dependent());
    }
}
