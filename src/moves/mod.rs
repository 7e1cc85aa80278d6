//! Move descriptors evaluated by cost delegates.
//!
//! A neighborhood describes a candidate edit as a [`Move`] against an
//! unmodified tour. A [`CostDelegate`](crate::cost::CostDelegate) computes
//! its improvement without touching the tour; if the move is accepted,
//! [`MoveKind::apply`] performs it and returns the [`TourEdit`] reports to
//! hand back to the delegate.

mod path_relinking;

use std::fmt;

pub use path_relinking::{AtomicEdit, PathRelinkingEdit};

use crate::error::{CostError, TourError};
use crate::models::{NodeId, Tour, TourEdit};

/// An extra visit to a depot performed together with an insertion.
///
/// The depot node is inserted right before `succ`, which is either the
/// inserted node itself or a tour node visited no later than the
/// insertion's predecessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepotTrip {
    /// Depot node to insert.
    pub depot: NodeId,
    /// Node the depot visit precedes.
    pub succ: NodeId,
}

/// Insert `node` between `pred` and `succ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    /// Node to insert.
    pub node: NodeId,
    /// Node visited before the inserted node.
    pub pred: NodeId,
    /// Node visited after the inserted node.
    pub succ: NodeId,
    /// Optional depot visit inserted along with the node.
    pub depot_trip: Option<DepotTrip>,
}

impl Insertion {
    /// A single-node insertion.
    pub fn new(node: NodeId, pred: NodeId, succ: NodeId) -> Self {
        Self {
            node,
            pred,
            succ,
            depot_trip: None,
        }
    }

    /// Adds a depot visit right before `succ`.
    pub fn with_depot_trip(mut self, depot: NodeId, succ: NodeId) -> Self {
        self.depot_trip = Some(DepotTrip { depot, succ });
        self
    }

    /// Resolves the insertion into the shape of detour it causes in `tour`.
    ///
    /// A depot trip right before the inserted node gives an adjacent double
    /// insertion; a depot trip earlier in the tour gives two disjoint ones.
    pub fn detour(&self, tour: &Tour<'_>) -> Result<Detour, CostError> {
        let site = InsertionSite {
            pred: self.pred,
            node: self.node,
            succ: self.succ,
        };
        let trip = match self.depot_trip {
            None => return Ok(Detour::Single(site)),
            Some(trip) => trip,
        };
        if trip.succ == self.node {
            return Ok(Detour::Adjacent {
                pred: self.pred,
                first: trip.depot,
                second: self.node,
                succ: self.succ,
            });
        }
        let pos_trip = tour.require(trip.succ)?;
        let pos_pred = tour.require(self.pred)?;
        if pos_trip > pos_pred {
            return Err(CostError::InvalidMove(format!(
                "depot trip before {} comes after the insertion point {}",
                trip.succ, self.pred
            )));
        }
        let depot_pred = tour.pred(trip.succ).ok_or_else(|| {
            CostError::InvalidMove(format!("depot trip before first node {}", trip.succ))
        })?;
        Ok(Detour::Disjoint(
            InsertionSite {
                pred: depot_pred,
                node: trip.depot,
                succ: trip.succ,
            },
            site,
        ))
    }
}

/// One node inserted between two consecutive tour nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertionSite {
    /// Tour node before the insertion point.
    pub pred: NodeId,
    /// Inserted node.
    pub node: NodeId,
    /// Tour node after the insertion point.
    pub succ: NodeId,
}

/// The shapes of insertion detours a cost delegate can price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detour {
    /// One node between `pred` and `succ`.
    Single(InsertionSite),
    /// `first` then `second` between `pred` and `succ`.
    Adjacent {
        /// Tour node before both inserted nodes.
        pred: NodeId,
        /// First inserted node.
        first: NodeId,
        /// Second inserted node.
        second: NodeId,
        /// Tour node after both inserted nodes.
        succ: NodeId,
    },
    /// Two independent insertions; the first site's successor is visited no
    /// later than the second site's predecessor.
    Disjoint(InsertionSite, InsertionSite),
}

/// Remove `node` from its tour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Removal {
    /// Node to remove.
    pub node: NodeId,
}

/// Replace the edges `(first, succ(first))` and `(second, succ(second))` by
/// `(first, second)` and `(succ(first), succ(second))`, reversing the
/// segment in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoOpt {
    /// Start of the first removed edge.
    pub first: NodeId,
    /// Start of the second removed edge; visited after `first`.
    pub second: NodeId,
}

/// Move `node` so that it is visited right before `new_succ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    /// Node to move.
    pub node: NodeId,
    /// Its successor after the move.
    pub new_succ: NodeId,
}

/// The edit a [`Move`] proposes.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveKind {
    /// Single insertion, possibly with a depot trip.
    Insertion(Insertion),
    /// Single removal.
    Removal(Removal),
    /// Intra-tour 2-opt.
    TwoOpt(TwoOpt),
    /// Intra-tour node relocation.
    Shift(Shift),
    /// Path-relinking edit script.
    PathRelinking(PathRelinkingEdit),
}

impl MoveKind {
    /// Performs the edit on `tour` and returns the mutation reports in order.
    pub fn apply(&self, tour: &mut Tour<'_>) -> Result<Vec<TourEdit>, TourError> {
        match self {
            MoveKind::Insertion(ins) => {
                let mut edits = vec![tour.insert_after(ins.pred, ins.node)?];
                if let Some(trip) = ins.depot_trip {
                    edits.push(tour.insert_before(trip.succ, trip.depot)?);
                }
                Ok(edits)
            }
            MoveKind::Removal(rem) => Ok(vec![tour.remove(rem.node)?]),
            MoveKind::TwoOpt(two_opt) => {
                let head = tour
                    .succ(two_opt.first)
                    .ok_or(TourError::NodeNotInTour(two_opt.first))?;
                Ok(vec![tour.reverse(head, two_opt.second)?])
            }
            MoveKind::Shift(shift) => Ok(vec![tour.shift(shift.node, shift.new_succ)?]),
            MoveKind::PathRelinking(pr) => pr.apply(tour),
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveKind::Insertion(ins) => {
                write!(f, "Insertion({} between {} and {}", ins.node, ins.pred, ins.succ)?;
                if let Some(trip) = ins.depot_trip {
                    write!(f, ", depot {} before {}", trip.depot, trip.succ)?;
                }
                write!(f, ")")
            }
            MoveKind::Removal(rem) => write!(f, "Removal({})", rem.node),
            MoveKind::TwoOpt(t) => write!(f, "TwoOpt({}, {})", t.first, t.second),
            MoveKind::Shift(s) => write!(f, "Shift({} before {})", s.node, s.new_succ),
            MoveKind::PathRelinking(pr) => {
                write!(f, "PathRelinking[")?;
                for (i, edit) in pr.edits.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", edit)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A candidate edit of one tour of a solution, with the improvement last
/// computed for it.
///
/// # Examples
///
/// ```
/// use u_route_cost::moves::{Move, MoveKind};
///
/// let mv = Move::insertion(0, 5, 0, 1);
/// assert!(matches!(mv.kind(), MoveKind::Insertion(_)));
/// assert_eq!(mv.improvement(), None);
/// assert_eq!(mv.to_string(), "Insertion(5 between 0 and 1) in tour 0");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    tour: usize,
    kind: MoveKind,
    improvement: Option<f64>,
}

impl Move {
    /// Creates a move on the tour with index `tour`.
    pub fn new(tour: usize, kind: MoveKind) -> Self {
        Self {
            tour,
            kind,
            improvement: None,
        }
    }

    /// Single-node insertion of `node` between `pred` and `succ`.
    pub fn insertion(tour: usize, node: NodeId, pred: NodeId, succ: NodeId) -> Self {
        Self::new(tour, MoveKind::Insertion(Insertion::new(node, pred, succ)))
    }

    /// Removal of `node`.
    pub fn removal(tour: usize, node: NodeId) -> Self {
        Self::new(tour, MoveKind::Removal(Removal { node }))
    }

    /// 2-opt between the edges leaving `first` and `second`.
    pub fn two_opt(tour: usize, first: NodeId, second: NodeId) -> Self {
        Self::new(tour, MoveKind::TwoOpt(TwoOpt { first, second }))
    }

    /// Shift of `node` right before `new_succ`.
    pub fn shift(tour: usize, node: NodeId, new_succ: NodeId) -> Self {
        Self::new(tour, MoveKind::Shift(Shift { node, new_succ }))
    }

    /// Path-relinking script.
    pub fn path_relinking(tour: usize, edits: Vec<AtomicEdit>) -> Self {
        Self::new(tour, MoveKind::PathRelinking(PathRelinkingEdit::new(edits)))
    }

    /// Index of the tour the move applies to.
    pub fn tour(&self) -> usize {
        self.tour
    }

    /// The proposed edit.
    pub fn kind(&self) -> &MoveKind {
        &self.kind
    }

    /// Improvement of the objective (positive improves), once evaluated.
    pub fn improvement(&self) -> Option<f64> {
        self.improvement
    }

    /// Stores the evaluated improvement.
    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = Some(improvement);
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in tour {}", self.kind, self.tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TourSequence;
    use crate::testing::scenario;

    #[test]
    fn test_apply_insertion_and_removal() {
        let inst = scenario();
        let mut tour = Tour::with_depots(&inst, 0);
        Move::insertion(0, 3, 0, 1)
            .kind()
            .apply(&mut tour)
            .expect("valid");
        Move::insertion(0, 2, 0, 3)
            .kind()
            .apply(&mut tour)
            .expect("valid");
        assert_eq!(tour.nodes(), &[0, 2, 3, 1]);
        Move::removal(0, 3).kind().apply(&mut tour).expect("valid");
        assert_eq!(tour.nodes(), &[0, 2, 1]);
    }

    #[test]
    fn test_apply_two_opt_reverses_segment() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 3, 1]).expect("valid");
        Move::two_opt(0, 0, 3).kind().apply(&mut tour).expect("valid");
        assert_eq!(tour.nodes(), &[0, 3, 2, 1]);
    }

    #[test]
    fn test_display_kinds() {
        assert_eq!(Move::removal(1, 4).to_string(), "Removal(4) in tour 1");
        assert_eq!(Move::two_opt(0, 3, 7).kind().to_string(), "TwoOpt(3, 7)");
        let kind = MoveKind::Insertion(Insertion::new(5, 2, 3).with_depot_trip(9, 5));
        assert_eq!(kind.to_string(), "Insertion(5 between 2 and 3, depot 9 before 5)");
    }

    #[test]
    fn test_detour_shapes() {
        let inst = scenario();
        let tour = Tour::from_nodes(&inst, 0, &[0, 3, 1]).expect("valid");
        let single = Insertion::new(2, 3, 1);
        assert!(matches!(single.detour(&tour), Ok(Detour::Single(_))));

        let adjacent = Insertion::new(2, 3, 1).with_depot_trip(9, 2);
        assert_eq!(
            adjacent.detour(&tour),
            Ok(Detour::Adjacent {
                pred: 3,
                first: 9,
                second: 2,
                succ: 1
            })
        );

        let disjoint = Insertion::new(2, 3, 1).with_depot_trip(9, 3);
        assert_eq!(
            disjoint.detour(&tour),
            Ok(Detour::Disjoint(
                InsertionSite {
                    pred: 0,
                    node: 9,
                    succ: 3
                },
                InsertionSite {
                    pred: 3,
                    node: 2,
                    succ: 1
                }
            ))
        );

        let misplaced = Insertion::new(2, 0, 3).with_depot_trip(9, 1);
        assert!(matches!(misplaced.detour(&tour), Err(CostError::InvalidMove(_))));
    }

    #[test]
    fn test_improvement_is_recorded() {
        let mut mv = Move::shift(0, 2, 1);
        assert_eq!(mv.improvement(), None);
        mv.set_improvement(-3.5);
        assert_eq!(mv.improvement(), Some(-3.5));
    }
}
