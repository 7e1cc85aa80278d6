//! Working time without delayed departure.
//!
//! # Algorithm
//!
//! The resource leaves its home at the start time and its working time is
//! the completion time at the last node minus the start. An edit only
//! changes the arrival times from its first edited position onwards, so the
//! edited segment is re-walked from the cached arrival at the last unchanged
//! node. The walk stops as soon as the start of service at a node after the
//! segment matches its cached value, since everything downstream is then
//! unchanged.
//!
//! A single insertion on a cached tour needs no walk at all: the shift of
//! the arrival at the successor is absorbed by the waiting time of every
//! later node.
//!
//! # Complexity
//!
//! O(1) for a single insertion, O(edited span + propagation) otherwise.

use super::{check_insertion_site, check_known, neighbours, CostDelegate, PenaltyCell};
use crate::config::PenaltyConfig;
use crate::error::{CostError, TourError};
use crate::models::{NodeId, Tour, TourSequence};
use crate::moves::{Detour, Insertion, Removal, Shift, TwoOpt};

const NAME: &str = "WorkingTimeNoDelayDelegate";

/// Completion time minus start time, the resource leaving its home as soon
/// as possible.
///
/// The cumulative cost of a node is the end of its service minus the start
/// of the tour.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::{CostDelegate, WorkingTimeNoDelayDelegate};
/// use u_route_cost::distance::DistanceMatrix;
/// use u_route_cost::models::{Instance, Node, Resource, TimeWindow, Tour};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 10.0, 0.0, 0.0).with_time_window(TimeWindow::new(50.0, 60.0).unwrap()),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
/// let tour = Tour::with_depots(&instance, 0);
///
/// let delegate = WorkingTimeNoDelayDelegate::new();
/// // waits from 10 to 50, back at 60
/// assert_eq!(delegate.evaluate_detour(&tour, 0, 2, 1, false).unwrap(), 60.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkingTimeNoDelayDelegate {
    penalty: PenaltyCell,
}

impl WorkingTimeNoDelayDelegate {
    /// Creates a delegate without unserved penalty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detour on any representation: walks the prefix up to `pred`, then
    /// propagates the arrival with and without `node` until both agree.
    fn walk_detour(
        &self,
        seq: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        check_known(seq, node)?;
        let nodes = seq.nodes();
        let pos_pred = nodes
            .iter()
            .position(|&n| n == pred)
            .ok_or(TourError::NodeNotInTour(pred))?;
        let pos_succ = if is_removal { pos_pred + 2 } else { pos_pred + 1 };
        let valid = if is_removal {
            nodes.get(pos_pred + 1) == Some(&node) && nodes.get(pos_succ) == Some(&succ)
        } else {
            !nodes.contains(&node) && nodes.get(pos_succ) == Some(&succ)
        };
        if !valid {
            return Err(CostError::InvalidMove(format!(
                "{} is not a detour between {} and {}",
                node, pred, succ
            )));
        }

        let mut arrival = seq.start_time();
        for w in nodes[..=pos_pred].windows(2) {
            arrival = seq.arrival_after(w[0], arrival, w[1]);
        }
        let mut via = seq.arrival_after(node, seq.arrival_after(pred, arrival, node), succ);
        let mut direct = seq.arrival_after(pred, arrival, succ);
        let mut prev = succ;
        for &next in &nodes[pos_succ + 1..] {
            let tw = seq.time_window(prev);
            if tw.start_of_service(via) == tw.start_of_service(direct) {
                return Ok(0.0);
            }
            via = seq.arrival_after(prev, via, next);
            direct = seq.arrival_after(prev, direct, next);
            prev = next;
        }
        Ok(seq.departure_after(prev, via) - seq.departure_after(prev, direct))
    }
}

/// A cached tour with a current schedule.
fn current_tour<'s>(tour: &'s Tour<'s>) -> Result<&'s Tour<'s>, CostError> {
    if !tour.auto_updated() || !tour.schedule_is_current() {
        return Err(CostError::InvalidTourState {
            delegate: NAME,
            reason: "the tour schedule is not up to date",
        });
    }
    Ok(tour)
}

/// Completion time at the last node of the cached schedule.
fn completion(tour: &Tour<'_>) -> Result<f64, CostError> {
    let last = tour.last_node().ok_or(TourError::EmptyTour)?;
    Ok(tour.earliest_departure(last))
}

/// An edited tour described as the cached tour up to `keep` (exclusive),
/// then `middle`, then the cached tour from `resume` on.
struct Rewalk<'t, 'a> {
    tour: &'t Tour<'a>,
    keep: usize,
    middle: Vec<NodeId>,
    resume: usize,
}

impl<'t, 'a> Rewalk<'t, 'a> {
    fn insertion(tour: &'t Tour<'a>, detour: &Detour) -> Result<Self, CostError> {
        match *detour {
            Detour::Single(site) => Self::between(tour, site.pred, vec![site.node]),
            Detour::Adjacent {
                pred,
                first,
                second,
                ..
            } => Self::between(tour, pred, vec![first, second]),
            Detour::Disjoint(a, b) => {
                let keep = tour.require(a.succ)?;
                let until = tour.require(b.pred)?;
                let mut middle = Vec::with_capacity(until + 3 - keep);
                middle.push(a.node);
                middle.extend_from_slice(&tour.nodes()[keep..=until]);
                middle.push(b.node);
                Ok(Self {
                    tour,
                    keep,
                    middle,
                    resume: until + 1,
                })
            }
        }
    }

    fn between(tour: &'t Tour<'a>, pred: NodeId, middle: Vec<NodeId>) -> Result<Self, CostError> {
        let keep = tour.require(pred)? + 1;
        Ok(Self {
            tour,
            keep,
            middle,
            resume: keep,
        })
    }

    fn removal(tour: &'t Tour<'a>, node: NodeId) -> Result<Self, CostError> {
        let keep = tour.require(node)?;
        Ok(Self {
            tour,
            keep,
            middle: Vec::new(),
            resume: keep + 1,
        })
    }

    fn shift(tour: &'t Tour<'a>, node: NodeId, new_succ: NodeId) -> Result<Self, CostError> {
        let from = tour.require(node)?;
        let to = tour.require(new_succ)?;
        let nodes = tour.nodes();
        if to > from {
            let mut middle = nodes[from + 1..to].to_vec();
            middle.push(node);
            Ok(Self {
                tour,
                keep: from,
                middle,
                resume: to,
            })
        } else {
            let mut middle = vec![node];
            middle.extend_from_slice(&nodes[to..from]);
            Ok(Self {
                tour,
                keep: to,
                middle,
                resume: from + 1,
            })
        }
    }

    fn two_opt(tour: &'t Tour<'a>, first: NodeId, second: NodeId) -> Result<Self, CostError> {
        let keep = tour.require(first)? + 1;
        let until = tour.require(second)?;
        let middle = tour.nodes()[keep..=until].iter().rev().copied().collect();
        Ok(Self {
            tour,
            keep,
            middle,
            resume: until + 1,
        })
    }

    /// Completion time of the edited tour.
    fn completion(&self) -> Result<f64, CostError> {
        let tour = self.tour;
        let nodes = tour.nodes();
        let mut pred = nodes[self.keep - 1];
        let mut arrival = tour.earliest_arrival(pred);
        for &node in &self.middle {
            arrival = tour.arrival_after(pred, arrival, node);
            pred = node;
        }
        for &node in &nodes[self.resume..] {
            arrival = tour.arrival_after(pred, arrival, node);
            let tw = tour.time_window(node);
            if tw.start_of_service(arrival) == tw.start_of_service(tour.earliest_arrival(node)) {
                return completion(tour);
            }
            pred = node;
        }
        Ok(tour.departure_after(pred, arrival))
    }

    /// Old completion minus new completion.
    fn improvement(&self) -> Result<f64, CostError> {
        Ok(completion(self.tour)? - self.completion()?)
    }
}

impl CostDelegate for WorkingTimeNoDelayDelegate {
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
        if tour.is_empty() {
            return Ok(0.0);
        }
        if tour.schedule_is_current() {
            Ok(completion(tour)? - tour.start_time())
        } else {
            self.evaluate_sequence(tour)
        }
    }

    fn recompute_from(
        &self,
        tour: &mut Tour<'_>,
        from: Option<NodeId>,
    ) -> Result<f64, CostError> {
        let start = match from {
            Some(node) => tour.require(node)? + 1,
            None => 0,
        };
        if !tour.schedule_is_current() {
            tour.refresh_schedule();
        }
        if tour.is_empty() {
            tour.set_total_cost(0.0);
            return Ok(0.0);
        }
        let begin = tour.start_time();
        let nodes = tour.nodes()[start.min(tour.length())..].to_vec();
        for node in nodes {
            let elapsed = tour.earliest_departure(node) - begin;
            tour.set_cumulative_cost(node, elapsed);
        }
        let total = completion(tour)? - begin;
        tour.set_total_cost(total);
        Ok(total)
    }

    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError> {
        let nodes = seq.nodes();
        let last = match nodes.last() {
            Some(&last) => last,
            None => return Ok(0.0),
        };
        let begin = seq.start_time();
        let mut arrival = begin;
        for w in nodes.windows(2) {
            arrival = seq.arrival_after(w[0], arrival, w[1]);
        }
        Ok(seq.departure_after(last, arrival) - begin)
    }

    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        let cached = match tour.as_cached() {
            Some(cached) if cached.auto_updated() && cached.schedule_is_current() => cached,
            _ => return self.walk_detour(tour, pred, node, succ, is_removal),
        };
        if is_removal {
            if neighbours(cached, node)? != (pred, succ) {
                return Err(CostError::InvalidMove(format!(
                    "{} is not visited between {} and {}",
                    node, pred, succ
                )));
            }
            return Rewalk::removal(cached, node)?.improvement();
        }
        check_insertion_site(cached, pred, node, succ)?;
        let last = cached.last_node().ok_or(TourError::EmptyTour)?;
        let at_node = cached.arrival_after(pred, cached.earliest_arrival(pred), node);
        let shift = cached.arrival_after(node, at_node, succ) - cached.earliest_arrival(succ);
        let absorbed = cached.waiting_time(pred, last) + cached.waiting_at(last);
        Ok((shift - absorbed).max(0.0))
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        true
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        let tour = current_tour(tour)?;
        let detour = ins.detour(tour)?;
        match detour {
            Detour::Single(site) => {
                Ok(-self.evaluate_detour(tour, site.pred, site.node, site.succ, false)?)
            }
            Detour::Adjacent {
                pred,
                first,
                second,
                succ,
            } => {
                check_insertion_site(tour, pred, first, succ)?;
                check_known(tour, second)?;
                if second == first || tour.contains(second) {
                    return Err(TourError::NodeAlreadyInTour(second).into());
                }
                Rewalk::insertion(tour, &detour)?.improvement()
            }
            Detour::Disjoint(a, b) => {
                check_insertion_site(tour, a.pred, a.node, a.succ)?;
                check_insertion_site(tour, b.pred, b.node, b.succ)?;
                Rewalk::insertion(tour, &detour)?.improvement()
            }
        }
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        let tour = current_tour(tour)?;
        neighbours(tour, rem.node)?;
        Rewalk::removal(tour, rem.node)?.improvement()
    }

    fn evaluate_two_opt(&self, tour: &Tour<'_>, two_opt: &TwoOpt) -> Result<f64, CostError> {
        let tour = current_tour(tour)?;
        let (i, j) = (two_opt.first, two_opt.second);
        if tour.require(i)? >= tour.require(j)? {
            return Err(CostError::InvalidMove(format!(
                "2-opt edge {} must come before {}",
                i, j
            )));
        }
        if tour.succ(j).is_none() {
            return Err(CostError::InvalidMove(format!(
                "2-opt edge after last node {}",
                j
            )));
        }
        Rewalk::two_opt(tour, i, j)?.improvement()
    }

    fn evaluate_shift(&self, tour: &Tour<'_>, shift: &Shift) -> Result<f64, CostError> {
        let tour = current_tour(tour)?;
        let (_, succ) = neighbours(tour, shift.node)?;
        let target = tour.require(shift.new_succ)?;
        if shift.new_succ == succ {
            return Ok(0.0);
        }
        if shift.new_succ == shift.node || target == 0 {
            return Err(CostError::InvalidMove(format!(
                "cannot shift {} before {}",
                shift.node, shift.new_succ
            )));
        }
        Rewalk::shift(tour, shift.node, shift.new_succ)?.improvement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimpleTour;
    use crate::moves::MoveKind;
    use crate::testing::{random_instance, random_sequence, scenario};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TOL: f64 = 1e-6;

    fn cost_after(d: &WorkingTimeNoDelayDelegate, tour: &Tour<'_>, kind: &MoveKind) -> f64 {
        let mut copy = tour.clone();
        kind.apply(&mut copy).expect("valid");
        d.evaluate_tour(&copy).expect("valid")
    }

    fn improvement(d: &WorkingTimeNoDelayDelegate, tour: &Tour<'_>, kind: &MoveKind) -> f64 {
        match kind {
            MoveKind::Insertion(x) => d.evaluate_insertion(tour, x),
            MoveKind::Removal(x) => d.evaluate_removal(tour, x),
            MoveKind::TwoOpt(x) => d.evaluate_two_opt(tour, x),
            MoveKind::Shift(x) => d.evaluate_shift(tour, x),
            MoveKind::PathRelinking(x) => d.evaluate_path_relinking(tour, x),
        }
        .expect("valid")
    }

    #[test]
    fn test_scenario_both_orders() {
        let inst = scenario();
        let d = WorkingTimeNoDelayDelegate::new();
        let base = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        let ab = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        assert_eq!(d.evaluate_tour(&base).expect("valid"), 55.0);
        assert_eq!(d.evaluate_tour(&ab).expect("valid"), 55.0);
        assert_eq!(d.evaluate_detour(&base, 0, 2, 3, false), Ok(0.0));

        let simple = SimpleTour::new(&inst, 0, vec![0, 3, 1]);
        assert_eq!(d.evaluate_detour(&simple, 0, 2, 3, false), Ok(0.0));
        assert_eq!(d.evaluate_sequence(&simple), Ok(55.0));
    }

    #[test]
    fn test_cumulative_is_elapsed_departure() {
        let inst = scenario();
        let d = WorkingTimeNoDelayDelegate::new();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        d.update_tour(&mut tour).expect("valid");
        assert_eq!(tour.cumulative_cost(2), 15.0);
        assert_eq!(tour.cumulative_cost(3), 35.0);
        assert_eq!(tour.cumulative_cost(1), 55.0);
        assert_eq!(tour.total_cost(), 55.0);
    }

    #[test]
    fn test_round_trip_restores_cumulative() {
        let inst = random_instance(11, 8);
        let d = WorkingTimeNoDelayDelegate::new();
        let mut rng = StdRng::seed_from_u64(11);
        let nodes = random_sequence(&mut rng, &inst, 6);
        let mut tour = Tour::from_nodes(&inst, 0, &nodes).expect("valid");
        d.update_tour(&mut tour).expect("valid");
        let before: Vec<f64> = nodes.iter().map(|&n| tour.cumulative_cost(n)).collect();
        let total = tour.total_cost();

        let (pred, node) = (nodes[2], nodes[3]);
        let edit = tour.remove(node).expect("valid");
        d.on_tour_edited(&mut tour, &edit).expect("valid");
        let edit = tour.insert_after(pred, node).expect("valid");
        d.on_tour_edited(&mut tour, &edit).expect("valid");

        let after: Vec<f64> = nodes.iter().map(|&n| tour.cumulative_cost(n)).collect();
        assert_eq!(before, after);
        assert_eq!(tour.total_cost(), total);
    }

    #[test]
    fn test_stale_tour_rejected() {
        let inst = scenario();
        let d = WorkingTimeNoDelayDelegate::new();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        tour.set_auto_updated(false);
        assert!(matches!(
            d.evaluate_removal(&tour, &Removal { node: 2 }),
            Err(CostError::InvalidTourState { .. })
        ));
        // detours fall back to a walk
        assert_eq!(d.evaluate_detour(&tour, 0, 2, 3, true), Ok(0.0));
    }

    proptest! {
        #[test]
        fn prop_moves_match_recompute(
            seed in 0u64..5_000,
            count in 1usize..8,
            a in 0usize..16,
            b in 0usize..16,
        ) {
            let inst = random_instance(seed, 10);
            let mut rng = StdRng::seed_from_u64(seed);
            let nodes = random_sequence(&mut rng, &inst, count);
            let tour = Tour::from_nodes(&inst, 0, &nodes).expect("valid");
            let d = WorkingTimeNoDelayDelegate::new();
            let before = d.evaluate_tour(&tour).expect("valid");
            let len = nodes.len();
            let outside: Vec<NodeId> = (2..inst.num_nodes()).filter(|n| !tour.contains(*n)).collect();

            let p = a % (len - 1);
            let inner = 1 + a % (len - 2);
            let target = 1 + b % (len - 1);
            let (lo, hi) = (a.min(b) % (len - 1), a.max(b) % (len - 1));
            let mut moves = vec![
                MoveKind::Insertion(Insertion::new(outside[0], nodes[p], nodes[p + 1])),
                MoveKind::Insertion(
                    Insertion::new(outside[0], nodes[p], nodes[p + 1]).with_depot_trip(outside[1], outside[0]),
                ),
                MoveKind::Removal(Removal { node: nodes[inner] }),
            ];
            if p >= 1 {
                let trip_succ = nodes[1 + b % p];
                moves.push(MoveKind::Insertion(
                    Insertion::new(outside[0], nodes[p], nodes[p + 1]).with_depot_trip(outside[1], trip_succ),
                ));
            }
            if lo < hi {
                moves.push(MoveKind::TwoOpt(TwoOpt { first: nodes[lo], second: nodes[hi] }));
            }
            if nodes[target] != nodes[inner] {
                moves.push(MoveKind::Shift(Shift { node: nodes[inner], new_succ: nodes[target] }));
            }

            for kind in moves {
                let imp = improvement(&d, &tour, &kind);
                let after = cost_after(&d, &tour, &kind);
                prop_assert!((before - after - imp).abs() < TOL, "{}: {} vs {}", kind, before - after, imp);
            }
        }

        #[test]
        fn prop_walk_matches_cached_detour(seed in 0u64..5_000, count in 1usize..8, at in 0usize..8) {
            let inst = random_instance(seed, 10);
            let mut rng = StdRng::seed_from_u64(seed);
            let nodes = random_sequence(&mut rng, &inst, count);
            let tour = Tour::from_nodes(&inst, 0, &nodes).expect("valid");
            let simple = SimpleTour::new(&inst, 0, nodes.clone());
            let d = WorkingTimeNoDelayDelegate::new();

            let node = (2..inst.num_nodes()).find(|n| !tour.contains(*n)).expect("free request");
            let p = at % (nodes.len() - 1);
            let cached = d.evaluate_detour(&tour, nodes[p], node, nodes[p + 1], false).expect("valid");
            let walked = d.evaluate_detour(&simple, nodes[p], node, nodes[p + 1], false).expect("valid");
            prop_assert!((cached - walked).abs() < TOL);

            let inner = 1 + at % (nodes.len() - 2);
            let (pred, succ) = (nodes[inner - 1], nodes[inner + 1]);
            let cached = d.evaluate_detour(&tour, pred, nodes[inner], succ, true).expect("valid");
            let walked = d.evaluate_detour(&simple, pred, nodes[inner], succ, true).expect("valid");
            prop_assert!((cached - walked).abs() < TOL);
        }
    }
}
