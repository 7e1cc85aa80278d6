//! The primary tour representation with cached schedule information.

use super::schedule::Schedule;
use super::{Instance, NodeId, TimeWindow, TourEdit, TourSequence};
use crate::error::TourError;

/// An ordered visiting sequence for one resource, with position lookup and
/// a cached schedule.
///
/// The tour stores two kinds of cached values:
///
/// - the schedule (earliest arrivals, waiting times, forward slack), kept
///   current by every mutation while [`auto_updated`](Self::auto_updated)
///   is set;
/// - the per-node cumulative cost and the total cost, which belong to the
///   cost delegate and are only written through
///   [`set_cumulative_cost`](Self::set_cumulative_cost) and
///   [`set_total_cost`](Self::set_total_cost).
///
/// Nodes in the frozen prefix (see [`freeze_through`](Self::freeze_through))
/// cannot be moved and their start of service is pinned.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::{Instance, Node, Resource, TimeWindow, Tour, TourSequence};
/// use u_route_cost::distance::DistanceMatrix;
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 10.0, 0.0, 5.0).with_time_window(TimeWindow::new(20.0, 30.0).unwrap()),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
///
/// let mut tour = Tour::with_depots(&instance, 0);
/// tour.insert_after(0, 2).unwrap();
/// assert_eq!(tour.nodes(), &[0, 2, 1]);
/// assert_eq!(tour.earliest_arrival(2), 10.0);
/// assert_eq!(tour.waiting_at(2), 10.0);
/// assert_eq!(tour.earliest_arrival(1), 35.0);
/// ```
#[derive(Debug, Clone)]
pub struct Tour<'a> {
    instance: &'a Instance,
    resource: usize,
    nodes: Vec<NodeId>,
    positions: Vec<Option<usize>>,
    cumulative: Vec<f64>,
    pinned: Vec<Option<TimeWindow>>,
    frozen: usize,
    total_cost: f64,
    auto_updated: bool,
    stale: bool,
    schedule: Schedule,
}

impl<'a> Tour<'a> {
    /// Creates an empty tour for the given resource.
    pub fn new(instance: &'a Instance, resource: usize) -> Self {
        let n = instance.num_nodes();
        Self {
            instance,
            resource,
            nodes: Vec::new(),
            positions: vec![None; n],
            cumulative: vec![0.0; n],
            pinned: vec![None; n],
            frozen: 0,
            total_cost: 0.0,
            auto_updated: true,
            stale: false,
            schedule: Schedule::default(),
        }
    }

    /// Creates a tour that only visits the resource's home and end nodes.
    ///
    /// # Panics
    ///
    /// Panics if `resource` is out of bounds or its home and end are the
    /// same node.
    pub fn with_depots(instance: &'a Instance, resource: usize) -> Self {
        let res = instance.resource(resource);
        let mut tour = Self::new(instance, resource);
        for node in [res.home(), res.end()] {
            if let Err(err) = tour.push(node) {
                panic!("invalid depots for resource {}: {}", resource, err);
            }
        }
        tour
    }

    /// Creates a tour visiting `nodes` in order.
    pub fn from_nodes(
        instance: &'a Instance,
        resource: usize,
        nodes: &[NodeId],
    ) -> Result<Self, TourError> {
        let mut tour = Self::new(instance, resource);
        tour.auto_updated = false;
        for &node in nodes {
            tour.push(node)?;
        }
        tour.set_auto_updated(true);
        Ok(tour)
    }

    // ---- Lookup ----

    /// Position of `node`, if visited.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.positions.get(node).copied().flatten()
    }

    /// Position of `node`, or [`TourError::NodeNotInTour`].
    pub fn require(&self, node: NodeId) -> Result<usize, TourError> {
        self.position(node).ok_or(TourError::NodeNotInTour(node))
    }

    /// Returns `true` if the tour visits `node`.
    pub fn contains(&self, node: NodeId) -> bool {
        self.position(node).is_some()
    }

    /// Node visited at `pos`.
    pub fn node_at(&self, pos: usize) -> Option<NodeId> {
        self.nodes.get(pos).copied()
    }

    /// Predecessor of `node`; `None` for the first node or a node not visited.
    pub fn pred(&self, node: NodeId) -> Option<NodeId> {
        let pos = self.position(node)?;
        pos.checked_sub(1).map(|p| self.nodes[p])
    }

    /// Successor of `node`; `None` for the last node or a node not visited.
    pub fn succ(&self, node: NodeId) -> Option<NodeId> {
        let pos = self.position(node)?;
        self.nodes.get(pos + 1).copied()
    }

    /// Returns `true` if the tour visits no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---- Delegate-owned cache ----

    /// Cost accumulated from the first node up to `node`, as last stored by
    /// the cost delegate.
    pub fn cumulative_cost(&self, node: NodeId) -> f64 {
        self.cumulative[node]
    }

    /// Stores the cumulative cost of `node`.
    pub fn set_cumulative_cost(&mut self, node: NodeId, cost: f64) {
        self.cumulative[node] = cost;
    }

    /// Total cost of the tour, as last stored by the cost delegate.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Stores the total cost of the tour.
    pub fn set_total_cost(&mut self, cost: f64) {
        self.total_cost = cost;
    }

    // ---- Schedule ----

    /// Whether mutations keep the schedule current.
    pub fn auto_updated(&self) -> bool {
        self.auto_updated
    }

    /// Enables or disables automatic schedule maintenance. Enabling it
    /// refreshes the whole schedule.
    pub fn set_auto_updated(&mut self, auto_updated: bool) {
        let was = self.auto_updated;
        self.auto_updated = auto_updated;
        if auto_updated && !was {
            self.refresh_schedule();
        }
    }

    /// Recomputes the whole schedule.
    pub fn refresh_schedule(&mut self) {
        self.rebuild_schedule(0);
    }

    /// Returns `true` if the cached schedule covers every visited node.
    pub fn schedule_is_current(&self) -> bool {
        !self.stale && self.schedule.len() == self.nodes.len()
    }

    /// Earliest arrival time at `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not visited.
    pub fn earliest_arrival(&self, node: NodeId) -> f64 {
        self.schedule.arrival(self.pos(node))
    }

    /// Earliest end of service at `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not visited.
    pub fn earliest_departure(&self, node: NodeId) -> f64 {
        self.departure_after(node, self.earliest_arrival(node))
    }

    /// Waiting time at `node` before its window opens.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not visited.
    pub fn waiting_at(&self, node: NodeId) -> f64 {
        self.schedule.waiting(self.pos(node))
    }

    /// Total waiting at the nodes strictly between `a` and `b`. Zero when `b`
    /// does not come after `a`.
    ///
    /// # Panics
    ///
    /// Panics if either node is not visited.
    pub fn waiting_time(&self, a: NodeId, b: NodeId) -> f64 {
        self.schedule.waiting_between(self.pos(a), self.pos(b))
    }

    /// Forward slack of `a` relative to the nodes after it up to `b`: how far
    /// the departure from `a` can be postponed before a due date in `(a, b]`
    /// is missed. Infinite when `b` does not come after `a`, negative when a
    /// due date is already missed.
    ///
    /// # Panics
    ///
    /// Panics if either node is not visited.
    pub fn forward_slack(&self, a: NodeId, b: NodeId) -> f64 {
        self.schedule.slack_between(self.pos(a), self.pos(b))
    }

    /// Shortest possible duration of the tour when the start is postponed
    /// as far as the waiting and the slack allow.
    ///
    /// # Panics
    ///
    /// Panics if the schedule is not current.
    pub fn minimal_duration(&self) -> f64 {
        self.schedule.minimal_duration(self)
    }

    // ---- Freezing ----

    /// Number of nodes in the frozen prefix.
    pub fn frozen_len(&self) -> usize {
        self.frozen
    }

    /// Returns `true` if `node` belongs to the frozen prefix.
    pub fn is_frozen(&self, node: NodeId) -> bool {
        self.position(node).is_some_and(|pos| pos < self.frozen)
    }

    /// Freezes every node up to and including `node`. Their start of service
    /// is pinned to its current earliest value.
    pub fn freeze_through(&mut self, node: NodeId) -> Result<TourEdit, TourError> {
        let pos = self.require(node)?;
        self.refresh_schedule();
        for p in self.frozen..=pos {
            let n = self.nodes[p];
            let sos = self
                .time_window(n)
                .start_of_service(self.schedule.arrival(p));
            self.pinned[n] = TimeWindow::new(sos, sos);
        }
        self.frozen = self.frozen.max(pos + 1);
        self.refresh_schedule();
        Ok(TourEdit::NodeFrozen { node })
    }

    // ---- Mutations ----

    /// Inserts `node` right after `pred`.
    pub fn insert_after(&mut self, pred: NodeId, node: NodeId) -> Result<TourEdit, TourError> {
        let pos = self.require(pred)? + 1;
        self.insert_at(pos, node)?;
        Ok(TourEdit::NodeInserted {
            pred: Some(pred),
            node,
            succ: self.node_at(pos + 1),
        })
    }

    /// Inserts `node` right before `succ`.
    pub fn insert_before(&mut self, succ: NodeId, node: NodeId) -> Result<TourEdit, TourError> {
        let pos = self.require(succ)?;
        self.insert_at(pos, node)?;
        Ok(TourEdit::NodeInserted {
            pred: pos.checked_sub(1).map(|p| self.nodes[p]),
            node,
            succ: Some(succ),
        })
    }

    /// Appends `node` at the end of the tour.
    pub fn push(&mut self, node: NodeId) -> Result<TourEdit, TourError> {
        let pred = self.last_node();
        self.insert_at(self.nodes.len(), node)?;
        Ok(TourEdit::NodeInserted {
            pred,
            node,
            succ: None,
        })
    }

    /// Removes `node` from the tour.
    pub fn remove(&mut self, node: NodeId) -> Result<TourEdit, TourError> {
        let pos = self.require(node)?;
        let pred = self.pred(node);
        let succ = self.succ(node);
        self.remove_at(pos)?;
        Ok(TourEdit::NodeRemoved { pred, node, succ })
    }

    /// Replaces `previous` by `node` at the same position.
    pub fn replace(&mut self, previous: NodeId, node: NodeId) -> Result<TourEdit, TourError> {
        let pos = self.require(previous)?;
        self.check_unvisited(node)?;
        self.check_unfrozen(pos)?;
        self.nodes[pos] = node;
        self.positions[previous] = None;
        self.positions[node] = Some(pos);
        self.after_change(pos);
        Ok(TourEdit::NodeReplaced {
            pred: pos.checked_sub(1).map(|p| self.nodes[p]),
            previous,
            node,
            succ: self.node_at(pos + 1),
        })
    }

    /// Exchanges the positions of `a` and `b`.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<TourEdit, TourError> {
        let pa = self.require(a)?;
        let pb = self.require(b)?;
        let (lo, hi) = (pa.min(pb), pa.max(pb));
        self.check_unfrozen(lo)?;
        let first = self.nodes[lo];
        let second = self.nodes[hi];
        self.nodes.swap(lo, hi);
        self.positions[first] = Some(hi);
        self.positions[second] = Some(lo);
        self.after_change(lo);
        Ok(TourEdit::NodesSwapped {
            pred: lo.checked_sub(1).map(|p| self.nodes[p]),
            first,
            second,
        })
    }

    /// Moves `node` so that it is visited right before `new_succ`.
    pub fn shift(&mut self, node: NodeId, new_succ: NodeId) -> Result<TourEdit, TourError> {
        let from = self.require(node)?;
        let to = self.require(new_succ)?;
        if node == new_succ {
            return Err(TourError::NodeAlreadyInTour(node));
        }
        let target = if to > from { to - 1 } else { to };
        self.check_unfrozen(from.min(target))?;
        let former_pred = self.pred(node);
        self.nodes.remove(from);
        self.nodes.insert(target, node);
        let lo = from.min(target);
        self.reindex(lo);
        self.after_change(lo);
        Ok(TourEdit::NodeShifted {
            node,
            former_pred,
            forward: to > from,
        })
    }

    /// Reverses the segment from `first` to `last` (in either order).
    pub fn reverse(&mut self, first: NodeId, last: NodeId) -> Result<TourEdit, TourError> {
        let pf = self.require(first)?;
        let pl = self.require(last)?;
        let (lo, hi) = (pf.min(pl), pf.max(pl));
        self.check_unfrozen(lo)?;
        let (first, last) = (self.nodes[lo], self.nodes[hi]);
        self.nodes[lo..=hi].reverse();
        self.reindex(lo);
        self.after_change(lo);
        Ok(TourEdit::SubtourReversed {
            pred: lo.checked_sub(1).map(|p| self.nodes[p]),
            first,
            last,
            succ: self.node_at(hi + 1),
        })
    }

    /// Removes the segment from `first` to `last` inclusive.
    pub fn remove_subtour(&mut self, first: NodeId, last: NodeId) -> Result<TourEdit, TourError> {
        let pf = self.require(first)?;
        let pl = self.require(last)?;
        if pl < pf {
            return Err(TourError::NodeNotInTour(last));
        }
        self.check_unfrozen(pf)?;
        let removed: Vec<NodeId> = self.nodes.drain(pf..=pl).collect();
        for &node in &removed {
            self.positions[node] = None;
        }
        self.reindex(pf);
        self.after_change(pf);
        Ok(TourEdit::SubtourRemoved {
            pred: pf.checked_sub(1).map(|p| self.nodes[p]),
            removed,
            succ: self.node_at(pf),
        })
    }

    /// Inserts `nodes` in order right after `pred`.
    pub fn insert_subtour(
        &mut self,
        pred: NodeId,
        nodes: &[NodeId],
    ) -> Result<TourEdit, TourError> {
        let pos = self.require(pred)? + 1;
        self.check_unfrozen(pos)?;
        for (i, &node) in nodes.iter().enumerate() {
            self.check_unvisited(node)?;
            if nodes[..i].contains(&node) {
                return Err(TourError::NodeAlreadyInTour(node));
            }
        }
        self.nodes.splice(pos..pos, nodes.iter().copied());
        self.reindex(pos);
        self.after_change(pos);
        Ok(TourEdit::TourInserted {
            pred: Some(pred),
            inserted: nodes.to_vec(),
            succ: self.node_at(pos + nodes.len()),
        })
    }

    // ---- Internals ----

    fn pos(&self, node: NodeId) -> usize {
        match self.position(node) {
            Some(pos) => pos,
            None => panic!("node {} is not in the tour", node),
        }
    }

    fn check_unvisited(&self, node: NodeId) -> Result<(), TourError> {
        if node >= self.positions.len() {
            return Err(TourError::UnknownNode(node));
        }
        if self.positions[node].is_some() {
            return Err(TourError::NodeAlreadyInTour(node));
        }
        Ok(())
    }

    /// Edits at positions before the end of the frozen prefix are rejected.
    fn check_unfrozen(&self, pos: usize) -> Result<(), TourError> {
        if pos < self.frozen {
            return Err(TourError::FrozenNode(self.nodes[pos]));
        }
        Ok(())
    }

    fn insert_at(&mut self, pos: usize, node: NodeId) -> Result<(), TourError> {
        self.check_unvisited(node)?;
        self.check_unfrozen(pos)?;
        self.nodes.insert(pos, node);
        self.reindex(pos);
        self.after_change(pos);
        Ok(())
    }

    fn remove_at(&mut self, pos: usize) -> Result<(), TourError> {
        self.check_unfrozen(pos)?;
        let node = self.nodes.remove(pos);
        self.positions[node] = None;
        self.reindex(pos);
        self.after_change(pos);
        Ok(())
    }

    fn reindex(&mut self, from: usize) {
        for (p, &node) in self.nodes.iter().enumerate().skip(from) {
            self.positions[node] = Some(p);
        }
    }

    fn after_change(&mut self, pos: usize) {
        if self.auto_updated {
            self.rebuild_schedule(pos);
        } else {
            self.stale = true;
        }
    }

    fn rebuild_schedule(&mut self, from: usize) {
        let mut schedule = std::mem::take(&mut self.schedule);
        schedule.rebuild_from(self, from);
        self.schedule = schedule;
        if from == 0 {
            self.stale = false;
        }
    }
}

impl TourSequence for Tour<'_> {
    fn instance(&self) -> &Instance {
        self.instance
    }

    fn resource(&self) -> usize {
        self.resource
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn kind(&self) -> &'static str {
        "Tour"
    }

    fn as_cached(&self) -> Option<&Tour<'_>> {
        Some(self)
    }

    fn time_window(&self, node: NodeId) -> TimeWindow {
        self.pinned[node].unwrap_or_else(|| self.instance.time_window(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scenario;

    #[test]
    fn test_with_depots() {
        let inst = scenario();
        let tour = Tour::with_depots(&inst, 0);
        assert_eq!(tour.nodes(), &[0, 1]);
        assert_eq!(tour.first_node(), Some(0));
        assert_eq!(tour.last_node(), Some(1));
        assert_eq!(tour.pred(1), Some(0));
        assert_eq!(tour.succ(1), None);
    }

    #[test]
    fn test_schedule_with_waiting() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        assert_eq!(tour.earliest_arrival(3), 20.0);
        assert_eq!(tour.waiting_at(3), 10.0);
        assert_eq!(tour.earliest_departure(3), 35.0);
        assert_eq!(tour.earliest_arrival(1), 55.0);
        assert_eq!(tour.waiting_time(0, 1), 10.0);
        assert_eq!(tour.waiting_time(0, 3), 0.0);
        // B: 40 - 20, end depot: 100 - 55 + 10
        assert_eq!(tour.forward_slack(0, 1), 20.0);
        assert_eq!(tour.forward_slack(3, 1), 45.0);
        assert_eq!(tour.forward_slack(1, 1), f64::INFINITY);
        assert_eq!(tour.minimal_duration(), 45.0);
    }

    #[test]
    fn test_minimal_duration_infeasible_order() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 2, 1]).expect("valid");
        assert_eq!(tour.earliest_arrival(2), 50.0);
        assert!(tour.forward_slack(0, 1) < 0.0);
        assert_eq!(tour.minimal_duration(), 85.0);
    }

    #[test]
    fn test_insert_and_remove_keep_positions() {
        let inst = scenario();
        let mut tour = Tour::with_depots(&inst, 0);
        let edit = tour.insert_after(0, 3).expect("valid");
        assert_eq!(
            edit,
            TourEdit::NodeInserted {
                pred: Some(0),
                node: 3,
                succ: Some(1)
            }
        );
        tour.insert_before(3, 2).expect("valid");
        assert_eq!(tour.nodes(), &[0, 2, 3, 1]);
        assert_eq!(tour.position(3), Some(2));
        assert_eq!(tour.minimal_duration(), 55.0);

        let edit = tour.remove(2).expect("valid");
        assert_eq!(
            edit,
            TourEdit::NodeRemoved {
                pred: Some(0),
                node: 2,
                succ: Some(3)
            }
        );
        assert!(!tour.contains(2));
        assert_eq!(tour.position(3), Some(1));
        assert_eq!(tour.minimal_duration(), 45.0);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let inst = scenario();
        let mut tour = Tour::with_depots(&inst, 0);
        assert_eq!(tour.insert_after(0, 1), Err(TourError::NodeAlreadyInTour(1)));
        assert_eq!(tour.insert_after(2, 3), Err(TourError::NodeNotInTour(2)));
        assert_eq!(tour.insert_after(0, 99), Err(TourError::UnknownNode(99)));
    }

    #[test]
    fn test_shift_forward_and_backward() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        let edit = tour.shift(2, 1).expect("valid");
        assert_eq!(tour.nodes(), &[0, 3, 2, 1]);
        assert_eq!(
            edit,
            TourEdit::NodeShifted {
                node: 2,
                former_pred: Some(0),
                forward: true
            }
        );

        let edit = tour.shift(2, 3).expect("valid");
        assert_eq!(tour.nodes(), &[0, 2, 3, 1]);
        assert_eq!(
            edit,
            TourEdit::NodeShifted {
                node: 2,
                former_pred: Some(3),
                forward: false
            }
        );
        assert_eq!(tour.minimal_duration(), 55.0);
    }

    #[test]
    fn test_reverse_and_subtours() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        tour.reverse(3, 2).expect("valid");
        assert_eq!(tour.nodes(), &[0, 3, 2, 1]);
        assert_eq!(tour.position(2), Some(2));

        let edit = tour.remove_subtour(3, 2).expect("valid");
        assert_eq!(
            edit,
            TourEdit::SubtourRemoved {
                pred: Some(0),
                removed: vec![3, 2],
                succ: Some(1)
            }
        );
        assert_eq!(tour.nodes(), &[0, 1]);

        tour.insert_subtour(0, &[2, 3]).expect("valid");
        assert_eq!(tour.nodes(), &[0, 2, 3, 1]);
        assert_eq!(tour.earliest_arrival(1), 55.0);
    }

    #[test]
    fn test_frozen_prefix() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        tour.freeze_through(2).expect("valid");
        assert_eq!(tour.frozen_len(), 2);
        assert!(tour.is_frozen(2));
        assert!(!tour.is_frozen(3));
        assert_eq!(tour.remove(2), Err(TourError::FrozenNode(2)));
        assert_eq!(tour.insert_after(0, 3), Err(TourError::NodeAlreadyInTour(3)));
        // pinned at its start of service
        assert_eq!(tour.time_window(2).ready(), 10.0);
        assert_eq!(tour.time_window(2).due(), 10.0);
        assert!(tour.remove(3).is_ok());
    }

    #[test]
    fn test_manual_schedule_refresh() {
        let inst = scenario();
        let mut tour = Tour::with_depots(&inst, 0);
        tour.set_auto_updated(false);
        tour.insert_after(0, 3).expect("valid");
        assert!(!tour.schedule_is_current());
        tour.set_auto_updated(true);
        assert!(tour.schedule_is_current());
        assert_eq!(tour.earliest_arrival(1), 55.0);
    }

    #[test]
    fn test_clone_is_independent() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        let mut copy = tour.clone();
        copy.insert_after(0, 2).expect("valid");
        copy.set_total_cost(1.0);
        assert_eq!(tour.nodes(), &[0, 3, 1]);
        assert_eq!(tour.total_cost(), 0.0);
        assert_eq!(tour.minimal_duration(), 45.0);
    }
}
