//! Error types for tour manipulation and cost evaluation.
//!
//! Every error here is a precondition violation on the caller's side: the
//! engine never retries and never returns an approximate value in place of
//! an exact one.

use crate::models::NodeId;

/// An error raised by [`Tour`](crate::models::Tour) lookups and mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum TourError {
    /// The node id does not exist in the instance.
    UnknownNode(NodeId),
    /// The node is not part of the tour.
    NodeNotInTour(NodeId),
    /// The node is already visited by the tour.
    NodeAlreadyInTour(NodeId),
    /// The node belongs to the frozen prefix of the tour.
    FrozenNode(NodeId),
    /// The solution has no tour with this index.
    UnknownTour(usize),
    /// The operation needs at least one node in the tour.
    EmptyTour,
}

impl std::fmt::Display for TourError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TourError::UnknownNode(node) => write!(f, "Node {} does not exist", node),
            TourError::NodeNotInTour(node) => write!(f, "Node {} is not in the tour", node),
            TourError::NodeAlreadyInTour(node) => {
                write!(f, "Node {} is already in the tour", node)
            }
            TourError::FrozenNode(node) => write!(f, "Node {} is frozen", node),
            TourError::UnknownTour(idx) => write!(f, "Tour {} does not exist", idx),
            TourError::EmptyTour => write!(f, "The tour is empty"),
        }
    }
}

impl std::error::Error for TourError {}

/// An error raised by a [`CostDelegate`](crate::cost::CostDelegate).
#[derive(Debug, Clone, PartialEq)]
pub enum CostError {
    /// The delegate has no formula for this move variant.
    UnsupportedMove {
        /// Name of the delegate.
        delegate: &'static str,
        /// Description of the rejected move.
        description: String,
    },
    /// The delegate cannot perform this kind of evaluation at all.
    UnsupportedOperation {
        /// Name of the delegate.
        delegate: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },
    /// An incremental formula needs cached aggregates that are not up to date.
    InvalidTourState {
        /// Name of the delegate.
        delegate: &'static str,
        /// What the formula expected.
        reason: &'static str,
    },
    /// The formula cannot introspect this tour representation.
    UnsupportedTourType {
        /// Name of the delegate.
        delegate: &'static str,
        /// Name of the tour representation.
        tour_kind: &'static str,
    },
    /// The move does not describe a valid edit of the tour.
    InvalidMove(String),
    /// A tour lookup or mutation failed.
    Tour(TourError),
}

impl std::fmt::Display for CostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostError::UnsupportedMove {
                delegate,
                description,
            } => write!(
                f,
                "Move {} is not supported by this cost delegate ({})",
                description, delegate
            ),
            CostError::UnsupportedOperation {
                delegate,
                operation,
            } => write!(f, "{} does not support {}", delegate, operation),
            CostError::InvalidTourState { delegate, reason } => {
                write!(f, "{}: invalid tour state, {}", delegate, reason)
            }
            CostError::UnsupportedTourType {
                delegate,
                tour_kind,
            } => write!(f, "{}: unsupported tour type {}", delegate, tour_kind),
            CostError::InvalidMove(reason) => write!(f, "Invalid move: {}", reason),
            CostError::Tour(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CostError::Tour(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TourError> for CostError {
    fn from(err: TourError) -> Self {
        CostError::Tour(err)
    }
}
