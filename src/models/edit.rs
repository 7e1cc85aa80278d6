//! Edit reports emitted by tour mutations.

use super::NodeId;

/// What a [`Tour`](super::Tour) mutation changed.
///
/// Every mutating method of [`Tour`](super::Tour) returns one of these. The caller hands
/// it to [`CostDelegate::on_tour_edited`](crate::cost::CostDelegate::on_tour_edited)
/// so that the delegate can refresh its cached values. `None` neighbours
/// stand for the start or the end of the tour.
#[derive(Debug, Clone, PartialEq)]
pub enum TourEdit {
    /// `node` was inserted between `pred` and `succ`.
    NodeInserted {
        pred: Option<NodeId>,
        node: NodeId,
        succ: Option<NodeId>,
    },
    /// `node` was removed from between `pred` and `succ`.
    NodeRemoved {
        pred: Option<NodeId>,
        node: NodeId,
        succ: Option<NodeId>,
    },
    /// `previous` was replaced by `node`.
    NodeReplaced {
        pred: Option<NodeId>,
        previous: NodeId,
        node: NodeId,
        succ: Option<NodeId>,
    },
    /// `first` and `second` exchanged places; `first` was visited first and
    /// `pred` was its predecessor.
    NodesSwapped {
        pred: Option<NodeId>,
        first: NodeId,
        second: NodeId,
    },
    /// `node` was moved; `former_pred` was its predecessor before the move.
    NodeShifted {
        node: NodeId,
        former_pred: Option<NodeId>,
        forward: bool,
    },
    /// The consecutive nodes in `removed` were taken out from between `pred` and `succ`.
    SubtourRemoved {
        pred: Option<NodeId>,
        removed: Vec<NodeId>,
        succ: Option<NodeId>,
    },
    /// The segment from `first` to `last` was reversed in place.
    SubtourReversed {
        pred: Option<NodeId>,
        first: NodeId,
        last: NodeId,
        succ: Option<NodeId>,
    },
    /// The nodes of `inserted` were inserted in order between `pred` and `succ`.
    TourInserted {
        pred: Option<NodeId>,
        inserted: Vec<NodeId>,
        succ: Option<NodeId>,
    },
    /// Every node up to and including `node` is now frozen.
    NodeFrozen { node: NodeId },
}
