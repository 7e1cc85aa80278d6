//! Read-only view shared by every tour representation.

use super::{Instance, NodeId, TimeWindow, Tour};

/// An ordered visiting sequence for one resource.
///
/// This is the "generic tour" interface: it exposes the sequence and the
/// static data needed to walk it. Formulas that rely on cached aggregates
/// ask for the primary representation through [`as_cached`](Self::as_cached).
pub trait TourSequence {
    /// The instance the tour belongs to.
    fn instance(&self) -> &Instance;

    /// Index of the resource performing the tour.
    fn resource(&self) -> usize;

    /// Visited nodes in order, depots included.
    fn nodes(&self) -> &[NodeId];

    /// Short name of the representation, used in error messages.
    fn kind(&self) -> &'static str;

    /// The primary cached representation, if this is one.
    fn as_cached(&self) -> Option<&Tour<'_>> {
        None
    }

    /// Number of visited nodes.
    fn length(&self) -> usize {
        self.nodes().len()
    }

    /// First visited node.
    fn first_node(&self) -> Option<NodeId> {
        self.nodes().first().copied()
    }

    /// Last visited node.
    fn last_node(&self) -> Option<NodeId> {
        self.nodes().last().copied()
    }

    /// Time window applying to `node` in this tour.
    fn time_window(&self, node: NodeId) -> TimeWindow {
        self.instance().time_window(node)
    }

    /// Service time of `node`.
    fn service_time(&self, node: NodeId) -> f64 {
        self.instance().service_time(node)
    }

    /// Travel time between two nodes for this tour's resource.
    fn travel_time(&self, from: NodeId, to: NodeId) -> f64 {
        self.instance().travel_time(from, to, self.resource())
    }

    /// Time at which the tour starts: the opening of the first node's window.
    fn start_time(&self) -> f64 {
        self.first_node()
            .map_or(0.0, |first| self.time_window(first).ready())
    }

    /// Arrival time at `node` when arriving at `pred` at `pred_arrival`
    /// and travelling directly from `pred` to `node`.
    fn arrival_after(&self, pred: NodeId, pred_arrival: f64, node: NodeId) -> f64 {
        self.time_window(pred).start_of_service(pred_arrival)
            + self.service_time(pred)
            + self.travel_time(pred, node)
    }

    /// End of service at `node` when arriving at `arrival`.
    fn departure_after(&self, node: NodeId, arrival: f64) -> f64 {
        self.time_window(node).start_of_service(arrival) + self.service_time(node)
    }
}

/// A bare visiting sequence without any cached state.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::{Instance, Node, Resource, SimpleTour, TourSequence};
/// use u_route_cost::distance::DistanceMatrix;
///
/// let nodes = vec![Node::depot(0, 0.0, 0.0), Node::depot(1, 0.0, 0.0), Node::new(2, 1.0, 0.0, 0.0)];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
/// let tour = SimpleTour::new(&instance, 0, vec![0, 2, 1]);
/// assert_eq!(tour.length(), 3);
/// assert!(tour.as_cached().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SimpleTour<'a> {
    instance: &'a Instance,
    resource: usize,
    nodes: Vec<NodeId>,
}

impl<'a> SimpleTour<'a> {
    /// Creates a sequence for the given resource.
    pub fn new(instance: &'a Instance, resource: usize, nodes: Vec<NodeId>) -> Self {
        Self {
            instance,
            resource,
            nodes,
        }
    }

    /// Copies the sequence of any tour.
    pub fn from_sequence(tour: &'a dyn TourSequence) -> Self {
        Self::new(tour.instance(), tour.resource(), tour.nodes().to_vec())
    }

    /// Removes every occurrence of `node`.
    pub fn without(mut self, node: NodeId) -> Self {
        self.nodes.retain(|&n| n != node);
        self
    }
}

impl TourSequence for SimpleTour<'_> {
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
        "SimpleTour"
    }
}
