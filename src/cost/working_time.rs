//! Working time: tour duration under time windows with delayed departure.
//!
//! # Algorithm
//!
//! The cost of a tour is its minimal duration: the completion time at the
//! last node minus the start, where the start may be postponed by up to
//! `min(F(first, last), W(first, last) + W_last)` (forward slack and the
//! waiting time up to and including the last node) without changing the
//! completion time.
//!
//! Inserting nodes between `m` and `n` shifts the arrival at `n` by `Δn`.
//! Waiting time downstream, the last node included, absorbs the shift, so
//! the completion moves by `max(0, Δn - W(m, last) - W_last)`. The new
//! forward slack is the minimum of the
//! slack before the insertion point, the slack of every inserted node and
//! the old slack from `n` onwards, which moves rigidly with the shift minus
//! the waiting gained on the inserted nodes. All terms are read from the
//! cached schedule in O(1).
//!
//! The closed forms assume the triangle inequality on travel times.
//!
//! Removals have no closed form and are priced on a copy of the tour.
//! 2-opt and shift moves are not supported.
//!
//! # Reference
//!
//! Savelsbergh, M. W. P. (1992). "The Vehicle Routing Problem with Time
//! Windows: Minimizing Route Duration". ORSA Journal on Computing 4(2).

use super::{
    check_insertion_site, check_known, check_removal_site, neighbours, CostDelegate, PenaltyCell,
};
use crate::config::PenaltyConfig;
use crate::error::{CostError, TourError};
use crate::models::{minimal_duration, NodeId, SimpleTour, Tour, TourSequence};
use crate::moves::{Detour, Insertion, InsertionSite, Removal};

const NAME: &str = "WorkingTimeDelegate";

/// Tour duration under time windows, letting the resource leave its home
/// as late as the downstream windows allow.
///
/// The cumulative cost of a node is the minimal duration of the tour prefix
/// ending at it, so the value at the last node equals the tour cost.
///
/// # Examples
///
/// ```
/// use u_route_cost::cost::{CostDelegate, WorkingTimeDelegate};
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
/// let delegate = WorkingTimeDelegate::new();
/// // leaving at 40 avoids any waiting: 10 out, 10 back
/// assert_eq!(delegate.evaluate_detour(&tour, 0, 2, 1, false).unwrap(), 20.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkingTimeDelegate {
    penalty: PenaltyCell,
}

impl WorkingTimeDelegate {
    /// Creates a delegate without unserved penalty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marginal duration of a detour of any shape.
    ///
    /// Insertions need the cached schedule of a [`Tour`]; removals (the
    /// inserted nodes of `detour` are then visited by the tour) are priced
    /// on a copy.
    pub fn evaluate_detours(
        &self,
        tour: &dyn TourSequence,
        detour: &Detour,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        if is_removal {
            let removed = match *detour {
                Detour::Single(site) => {
                    check_removal_site(tour, site.pred, site.node, site.succ)?;
                    vec![site.node]
                }
                Detour::Adjacent {
                    pred,
                    first,
                    second,
                    succ,
                } => {
                    check_removal_site(tour, pred, first, second)?;
                    check_removal_site(tour, first, second, succ)?;
                    vec![first, second]
                }
                Detour::Disjoint(a, b) => {
                    check_removal_site(tour, a.pred, a.node, a.succ)?;
                    check_removal_site(tour, b.pred, b.node, b.succ)?;
                    vec![a.node, b.node]
                }
            };
            return self.removal_by_copy(tour, &removed);
        }
        let cached = current_tour(tour)?;
        match *detour {
            Detour::Single(site) => {
                check_insertion_site(cached, site.pred, site.node, site.succ)?;
                Ok(chain_delta(cached, site.pred, &[site.node], site.succ))
            }
            Detour::Adjacent {
                pred,
                first,
                second,
                succ,
            } => {
                check_insertion_site(cached, pred, first, succ)?;
                check_known(cached, second)?;
                if second == first || cached.contains(second) {
                    return Err(TourError::NodeAlreadyInTour(second).into());
                }
                Ok(chain_delta(cached, pred, &[first, second], succ))
            }
            Detour::Disjoint(a, b) => {
                check_insertion_site(cached, a.pred, a.node, a.succ)?;
                check_insertion_site(cached, b.pred, b.node, b.succ)?;
                if a.node == b.node {
                    return Err(TourError::NodeAlreadyInTour(a.node).into());
                }
                let (early, late) = if cached.require(a.succ)? <= cached.require(b.pred)? {
                    (a, b)
                } else if cached.require(b.succ)? <= cached.require(a.pred)? {
                    (b, a)
                } else {
                    return Err(CostError::InvalidMove(format!(
                        "insertions of {} and {} share an edge",
                        a.node, b.node
                    )));
                };
                Ok(disjoint_delta(cached, &early, &late))
            }
        }
    }

    fn removal_by_copy(
        &self,
        seq: &dyn TourSequence,
        removed: &[NodeId],
    ) -> Result<f64, CostError> {
        tracing::warn!(
            delegate = NAME,
            nodes = ?removed,
            "no closed form for removals, evaluating a copy of the tour"
        );
        match seq.as_cached() {
            Some(tour) => {
                let before = self.evaluate_tour(tour)?;
                let mut shadow = tour.clone();
                for &node in removed {
                    shadow.remove(node)?;
                }
                Ok(before - self.evaluate_tour(&shadow)?)
            }
            None => {
                let before = self.evaluate_sequence(seq)?;
                let mut shadow = SimpleTour::from_sequence(seq);
                for &node in removed {
                    if !shadow.nodes().contains(&node) {
                        return Err(TourError::NodeNotInTour(node).into());
                    }
                    shadow = shadow.without(node);
                }
                Ok(before - self.evaluate_sequence(&shadow)?)
            }
        }
    }
}

/// The primary representation of `seq` with a current schedule.
fn current_tour<'s>(seq: &'s dyn TourSequence) -> Result<&'s Tour<'s>, CostError> {
    let tour = seq.as_cached().ok_or(CostError::UnsupportedTourType {
        delegate: NAME,
        tour_kind: seq.kind(),
    })?;
    if !tour.auto_updated() || !tour.schedule_is_current() {
        return Err(CostError::InvalidTourState {
            delegate: NAME,
            reason: "the tour schedule is not up to date",
        });
    }
    Ok(tour)
}

/// Waiting after `a` up to and including `last`.
fn waiting_through(tour: &Tour<'_>, a: NodeId, last: NodeId) -> f64 {
    tour.waiting_time(a, last) + tour.waiting_at(last)
}

/// `min(F(first, last), W(first, last) + W_last)` of the unchanged tour.
fn absorbable(tour: &Tour<'_>, first: NodeId, last: NodeId) -> f64 {
    tour.forward_slack(first, last)
        .min(waiting_through(tour, first, last))
}

/// Slack of `n` and of every node after it, measured from the first node.
fn slack_from(tour: &Tour<'_>, n: NodeId, until: NodeId) -> f64 {
    let own = tour.time_window(n).due() - tour.earliest_arrival(n);
    own.min(tour.waiting_at(n) + tour.forward_slack(n, until))
}

/// Change in duration when `chain` is inserted in order between the
/// consecutive nodes `m` and `n`.
fn chain_delta(tour: &Tour<'_>, m: NodeId, chain: &[NodeId], n: NodeId) -> f64 {
    let (first, last) = match (tour.first_node(), tour.last_node()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    let w_first_n = tour.waiting_time(first, n);

    let mut slack = tour.forward_slack(first, m);
    let mut waited = 0.0;
    let mut pred = m;
    let mut arrival = tour.earliest_arrival(m);
    for &r in chain {
        arrival = tour.arrival_after(pred, arrival, r);
        let tw = tour.time_window(r);
        slack = slack.min(tw.due() - arrival + w_first_n + waited);
        waited += tw.waiting_time(arrival);
        pred = r;
    }

    let shift = tour.arrival_after(pred, arrival, n) - tour.earliest_arrival(n);
    slack = slack.min(w_first_n + waited - shift + slack_from(tour, n, last));

    let w_m_last = waiting_through(tour, m, last);
    let waiting = w_first_n + waited + (w_m_last - shift).max(0.0);
    (shift - w_m_last).max(0.0) - slack.min(waiting) + absorbable(tour, first, last)
}

/// Change in duration when `early.node` and `late.node` are inserted at two
/// distinct places, `early.succ` being visited no later than `late.pred`.
fn disjoint_delta(tour: &Tour<'_>, early: &InsertionSite, late: &InsertionSite) -> f64 {
    let (first, last) = match (tour.first_node(), tour.last_node()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    let (m, r, n) = (early.pred, early.node, early.succ);
    let (i, q, j) = (late.pred, late.node, late.succ);
    let w_first_n = tour.waiting_time(first, n);

    // first insertion
    let ar = tour.arrival_after(m, tour.earliest_arrival(m), r);
    let wr = tour.time_window(r).waiting_time(ar);
    let dn = tour.arrival_after(r, ar, n) - tour.earliest_arrival(n);
    let mut slack = tour
        .forward_slack(first, m)
        .min(tour.time_window(r).due() - ar + w_first_n);
    slack = slack.min(w_first_n + wr - dn + slack_from(tour, n, i));

    // the shift reaching i, after the waiting on n..=i
    let w_m_j = tour.waiting_time(m, j);
    let departure_i = tour.earliest_departure(i) + (dn - w_m_j).max(0.0);
    let aq = departure_i + tour.travel_time(i, q);
    let wq = tour.time_window(q).waiting_time(aq);
    let w_first_q = w_first_n + wr + (w_m_j - dn).max(0.0);
    slack = slack.min(tour.time_window(q).due() - aq + w_first_q);

    // second insertion
    let dj = tour.arrival_after(q, aq, j) - tour.earliest_arrival(j);
    let w_first_j = w_first_q + wq;
    slack = slack.min(w_first_j - dj + slack_from(tour, j, last));

    let w_i_last = waiting_through(tour, i, last);
    let waiting = w_first_j + (w_i_last - dj).max(0.0);
    (dj - w_i_last).max(0.0) - slack.min(waiting) + absorbable(tour, first, last)
}

impl CostDelegate for WorkingTimeDelegate {
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
        if tour.schedule_is_current() {
            Ok(tour.minimal_duration())
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
        let first = match tour.first_node() {
            Some(first) => first,
            None => {
                tour.set_total_cost(0.0);
                return Ok(0.0);
            }
        };
        let begin = tour.start_time();
        let nodes = tour.nodes()[start.min(tour.length())..].to_vec();
        for node in nodes {
            let prefix = tour.earliest_departure(node) - (begin + absorbable(tour, first, node));
            tour.set_cumulative_cost(node, prefix);
        }
        let total = tour.minimal_duration();
        tour.set_total_cost(total);
        Ok(total)
    }

    fn evaluate_sequence(&self, seq: &dyn TourSequence) -> Result<f64, CostError> {
        Ok(minimal_duration(seq))
    }

    fn evaluate_detour(
        &self,
        tour: &dyn TourSequence,
        pred: NodeId,
        node: NodeId,
        succ: NodeId,
        is_removal: bool,
    ) -> Result<f64, CostError> {
        let site = InsertionSite { pred, node, succ };
        self.evaluate_detours(tour, &Detour::Single(site), is_removal)
    }

    fn is_insertion_sequence_dependent(&self) -> bool {
        true
    }

    fn evaluate_insertion(&self, tour: &Tour<'_>, ins: &Insertion) -> Result<f64, CostError> {
        let detour = ins.detour(tour)?;
        Ok(-self.evaluate_detours(tour, &detour, false)?)
    }

    fn evaluate_removal(&self, tour: &Tour<'_>, rem: &Removal) -> Result<f64, CostError> {
        neighbours(tour, rem.node)?;
        self.removal_by_copy(tour, &[rem.node])
    }

    fn on_node_frozen(&self, tour: &mut Tour<'_>, node: NodeId) -> Result<(), CostError> {
        let from = tour.pred(node);
        self.recompute_from(tour, from)?;
        Ok(())
    }
}
