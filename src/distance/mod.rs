//! Distance data between the nodes of an instance.

mod matrix;

pub use matrix::DistanceMatrix;
