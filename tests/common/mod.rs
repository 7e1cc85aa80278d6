//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use u_route_cost::distance::DistanceMatrix;
use u_route_cost::models::{Instance, Node, NodeId, Resource, TimeWindow};

pub const DEPOT: NodeId = 0;
pub const END: NodeId = 1;
pub const A: NodeId = 2;
pub const B: NodeId = 3;

fn window(ready: f64, due: f64) -> TimeWindow {
    TimeWindow::new(ready, due).expect("valid window")
}

/// Depot D and its end copy D', request A with window [10, 20] and request B
/// with window [30, 40], both served in 5. d(D, A) = 10, d(A, B) = 15,
/// d(D, B) = 20.
pub fn scenario() -> Instance {
    let nodes = vec![
        Node::depot(DEPOT, 0.0, 0.0).with_time_window(window(0.0, 100.0)),
        Node::depot(END, 0.0, 0.0).with_time_window(window(0.0, 100.0)),
        Node::new(A, 10.0, 0.0, 5.0).with_time_window(window(10.0, 20.0)),
        Node::new(B, 0.0, 20.0, 5.0).with_time_window(window(30.0, 40.0)),
    ];
    let mut dm = DistanceMatrix::new(4);
    for (a, b, d) in [(0, 2, 10.0), (0, 3, 20.0), (1, 2, 10.0), (1, 3, 20.0), (2, 3, 15.0)] {
        dm.set(a, b, d);
        dm.set(b, a, d);
    }
    Instance::new(nodes, dm, vec![Resource::new(0, DEPOT, END)])
}

/// Random Euclidean instance with two depot nodes and `requests` requests,
/// most of them with a time window.
pub fn random_instance(seed: u64, requests: usize) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut nodes = vec![
        Node::depot(DEPOT, 50.0, 50.0).with_time_window(window(0.0, 3000.0)),
        Node::depot(END, 50.0, 50.0).with_time_window(window(0.0, 3000.0)),
    ];
    for id in 2..requests + 2 {
        let mut node = Node::new(
            id,
            rng.random_range(0.0..100.0),
            rng.random_range(0.0..100.0),
            rng.random_range(1.0..10.0),
        );
        if rng.random_bool(0.75) {
            let ready = rng.random_range(0.0..500.0);
            node = node.with_time_window(window(ready, ready + rng.random_range(20.0..150.0)));
        }
        nodes.push(node);
    }
    let dm = DistanceMatrix::from_nodes(&nodes);
    Instance::new(nodes, dm, vec![Resource::new(0, DEPOT, END)])
}

/// `count` random requests of `instance` framed by the depots.
pub fn random_nodes(seed: u64, instance: &Instance, count: usize) -> Vec<NodeId> {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let mut requests: Vec<NodeId> = (2..instance.num_nodes()).collect();
    requests.shuffle(&mut rng);
    requests.truncate(count);
    let mut nodes = vec![DEPOT];
    nodes.extend(requests);
    nodes.push(END);
    nodes
}
