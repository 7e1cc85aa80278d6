//! Shared fixtures for unit tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::distance::DistanceMatrix;
use crate::models::{Instance, Node, Resource, TimeWindow};

fn window(ready: f64, due: f64) -> TimeWindow {
    TimeWindow::new(ready, due).expect("valid window")
}

/// Depot `0`, end depot `1`, request `A = 2` with window `[10, 20]` and
/// request `B = 3` with window `[30, 40]`, both with service time 5.
/// `d(D, A) = 10`, `d(A, B) = 15`, `d(D, B) = 20`.
pub(crate) fn scenario() -> Instance {
    let nodes = vec![
        Node::depot(0, 0.0, 0.0).with_time_window(window(0.0, 100.0)),
        Node::depot(1, 0.0, 0.0).with_time_window(window(0.0, 100.0)),
        Node::new(2, 10.0, 0.0, 5.0).with_time_window(window(10.0, 20.0)),
        Node::new(3, 0.0, 20.0, 5.0).with_time_window(window(30.0, 40.0)),
    ];
    let mut dm = DistanceMatrix::new(4);
    let edges = [(0, 1, 0.0), (0, 2, 10.0), (0, 3, 20.0), (1, 2, 10.0), (1, 3, 20.0), (2, 3, 15.0)];
    for (a, b, d) in edges {
        dm.set(a, b, d);
        dm.set(b, a, d);
    }
    Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)])
}

/// A random Euclidean instance with `requests` requests after the two
/// depots.
pub(crate) fn random_instance(seed: u64, requests: usize) -> Instance {
    random_instance_with_end(seed, requests, 0.0)
}

/// [`random_instance`] with the end depot opening at `end_ready`, so that
/// the resource may have to wait there.
pub(crate) fn random_instance_with_end(seed: u64, requests: usize, end_ready: f64) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut nodes = vec![
        Node::depot(0, 50.0, 50.0).with_time_window(window(0.0, 2000.0)),
        Node::depot(1, 50.0, 50.0).with_time_window(window(end_ready, 2000.0)),
    ];
    for id in 2..requests + 2 {
        let mut node = Node::new(
            id,
            rng.random_range(0.0..100.0),
            rng.random_range(0.0..100.0),
            rng.random_range(0.0..10.0),
        );
        if rng.random_bool(0.8) {
            let ready = rng.random_range(0.0..400.0);
            let width = rng.random_range(10.0..200.0);
            node = node.with_time_window(window(ready, ready + width));
        }
        nodes.push(node);
    }
    let dm = DistanceMatrix::from_nodes(&nodes);
    Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)])
}

/// A random visiting order of `count` of the instance's requests, framed by
/// the depots.
pub(crate) fn random_sequence(rng: &mut StdRng, instance: &Instance, count: usize) -> Vec<usize> {
    let mut requests: Vec<usize> = (2..instance.num_nodes()).collect();
    requests.shuffle(rng);
    requests.truncate(count);
    let mut seq = vec![0];
    seq.extend(requests);
    seq.push(1);
    seq
}
