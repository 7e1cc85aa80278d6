//! Problem instance: nodes, distances and resources.

use super::{Node, NodeId, Resource, TimeWindow};
use crate::distance::DistanceMatrix;

/// The static data shared by every tour of a solution.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::{Instance, Node, Resource};
/// use u_route_cost::distance::DistanceMatrix;
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::depot(1, 0.0, 0.0),
///     Node::new(2, 3.0, 4.0, 5.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes);
/// let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1).with_speed(0.5)]);
/// assert_eq!(instance.distance(0, 2), 5.0);
/// assert_eq!(instance.travel_time(0, 2, 0), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    nodes: Vec<Node>,
    distances: DistanceMatrix,
    resources: Vec<Resource>,
}

impl Instance {
    /// Creates an instance. Node `i` must have id `i`.
    pub fn new(nodes: Vec<Node>, distances: DistanceMatrix, resources: Vec<Resource>) -> Self {
        Self {
            nodes,
            distances,
            resources,
        }
    }

    /// All nodes, indexed by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of bounds.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// All resources.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// The resource with the given index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn resource(&self, idx: usize) -> &Resource {
        &self.resources[idx]
    }

    /// The distance matrix.
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Travel distance from `from` to `to`.
    pub fn distance(&self, from: NodeId, to: NodeId) -> f64 {
        self.distances.get(from, to)
    }

    /// Travel time from `from` to `to` for the given resource.
    pub fn travel_time(&self, from: NodeId, to: NodeId, resource: usize) -> f64 {
        self.distances.get(from, to) / self.resources[resource].speed()
    }

    /// Time window of a node (unbounded if none).
    pub fn time_window(&self, id: NodeId) -> TimeWindow {
        self.nodes[id].window()
    }

    /// Service time of a node.
    pub fn service_time(&self, id: NodeId) -> f64 {
        self.nodes[id].service_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_time_depends_on_resource() {
        let nodes = vec![Node::depot(0, 0.0, 0.0), Node::new(1, 6.0, 8.0, 0.0)];
        let dm = DistanceMatrix::from_nodes(&nodes);
        let inst = Instance::new(
            nodes,
            dm,
            vec![Resource::new(0, 0, 0), Resource::new(1, 0, 0).with_speed(2.0)],
        );
        assert!((inst.travel_time(0, 1, 0) - 10.0).abs() < 1e-10);
        assert!((inst.travel_time(0, 1, 1) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_window_is_unbounded() {
        let nodes = vec![Node::depot(0, 0.0, 0.0)];
        let dm = DistanceMatrix::from_nodes(&nodes);
        let inst = Instance::new(nodes, dm, vec![]);
        assert_eq!(inst.time_window(0), TimeWindow::unbounded());
        assert_eq!(inst.service_time(0), 0.0);
    }
}
