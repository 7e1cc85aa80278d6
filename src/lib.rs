//! # u-route-cost
//!
//! Incremental cost and feasibility evaluation for local search on routing
//! problems with time windows and multiple resources.
//!
//! Each objective is a cost delegate that prices whole tours from scratch
//! and candidate moves (insertions, removals, 2-opt, shifts, path-relinking
//! scripts) through constant-time or segment-local deltas over cumulative
//! values cached in the tour.
//!
//! ## Modules
//!
//! - [`models`]: nodes, resources, instances, cached tours and solutions
//! - [`distance`]: node-to-node distance matrix
//! - [`moves`]: move descriptions and path-relinking scripts
//! - [`cost`]: the `CostDelegate` trait, its objectives and decorators
//! - [`config`]: serde-backed settings for penalties, balance and noise
//! - [`error`]: tour and evaluation errors
//!
//! ## Example
//!
//! ```
//! use u_route_cost::cost::{CostDelegate, WorkingTimeDelegate};
//! use u_route_cost::distance::DistanceMatrix;
//! use u_route_cost::models::{Instance, Node, Resource, TimeWindow, Tour};
//! use u_route_cost::moves::Insertion;
//!
//! let nodes = vec![
//!     Node::depot(0, 0.0, 0.0),
//!     Node::depot(1, 0.0, 0.0),
//!     Node::new(2, 10.0, 0.0, 5.0).with_time_window(TimeWindow::new(10.0, 20.0).unwrap()),
//! ];
//! let dm = DistanceMatrix::from_nodes(&nodes);
//! let instance = Instance::new(nodes, dm, vec![Resource::new(0, 0, 1)]);
//!
//! let delegate = WorkingTimeDelegate::new();
//! let mut tour = Tour::with_depots(&instance, 0);
//! delegate.update_tour(&mut tour).unwrap();
//!
//! let improvement = delegate.evaluate_insertion(&tour, &Insertion::new(2, 0, 1)).unwrap();
//! let edit = tour.insert_after(0, 2).unwrap();
//! delegate.on_tour_edited(&mut tour, &edit).unwrap();
//! assert_eq!(tour.total_cost(), -improvement);
//! ```

pub mod config;
pub mod cost;
pub mod distance;
pub mod error;
pub mod models;
pub mod moves;

#[cfg(test)]
mod testing;
