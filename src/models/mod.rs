//! Domain model types for technician routing.
//!
//! Provides the static problem data (nodes with time windows, resources and
//! the distance matrix), tours as ordered visiting sequences with a cached
//! schedule, and solutions grouping one tour per resource.

mod edit;
mod instance;
mod node;
mod resource;
mod schedule;
mod sequence;
mod solution;
mod tour;

pub use edit::TourEdit;
pub use instance::Instance;
pub use node::{Node, NodeId, TimeWindow};
pub use resource::Resource;
pub use schedule::minimal_duration;
pub use sequence::{SimpleTour, TourSequence};
pub use solution::Solution;
pub use tour::Tour;
