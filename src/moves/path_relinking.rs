//! Composite edits produced by path relinking.

use std::fmt;

use crate::error::TourError;
use crate::models::{NodeId, Tour, TourEdit};

/// One step of a path-relinking edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicEdit {
    /// Insert `nodes` in order right after `after`.
    Insert {
        /// Node after which the first new node goes.
        after: NodeId,
        /// Nodes to insert, head first.
        nodes: Vec<NodeId>,
    },
    /// Remove `node`.
    Delete {
        /// Node to remove.
        node: NodeId,
    },
    /// Put `by` in place of `node`.
    Substitute {
        /// Node leaving the tour.
        node: NodeId,
        /// Node taking its slot.
        by: NodeId,
    },
}

impl AtomicEdit {
    /// Applies the edit to `tour`, returning the reports of every mutation
    /// in the order they happened.
    pub fn apply(&self, tour: &mut Tour<'_>) -> Result<Vec<TourEdit>, TourError> {
        match self {
            AtomicEdit::Insert { after, nodes } => {
                let mut edits = Vec::with_capacity(nodes.len());
                let mut pred = *after;
                for &node in nodes {
                    edits.push(tour.insert_after(pred, node)?);
                    pred = node;
                }
                Ok(edits)
            }
            AtomicEdit::Delete { node } => Ok(vec![tour.remove(*node)?]),
            AtomicEdit::Substitute { node, by } => Ok(vec![tour.replace(*node, *by)?]),
        }
    }
}

impl fmt::Display for AtomicEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicEdit::Insert { after, nodes } => write!(f, "ins({:?} after {})", nodes, after),
            AtomicEdit::Delete { node } => write!(f, "del({})", node),
            AtomicEdit::Substitute { node, by } => write!(f, "sub({} by {})", node, by),
        }
    }
}

/// An ordered edit script transforming a tour toward a reference tour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathRelinkingEdit {
    /// Atomic edits, applied in order.
    pub edits: Vec<AtomicEdit>,
}

impl PathRelinkingEdit {
    /// Creates an edit script.
    pub fn new(edits: Vec<AtomicEdit>) -> Self {
        Self { edits }
    }

    /// Applies every atomic edit in order.
    pub fn apply(&self, tour: &mut Tour<'_>) -> Result<Vec<TourEdit>, TourError> {
        let mut reports = Vec::new();
        for edit in &self.edits {
            reports.extend(edit.apply(tour)?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TourSequence;
    use crate::testing::scenario;

    #[test]
    fn test_apply_script() {
        let inst = scenario();
        let mut tour = Tour::with_depots(&inst, 0);
        let script = PathRelinkingEdit::new(vec![
            AtomicEdit::Insert {
                after: 0,
                nodes: vec![2, 3],
            },
            AtomicEdit::Delete { node: 2 },
        ]);
        let reports = script.apply(&mut tour).expect("valid");
        assert_eq!(reports.len(), 3);
        assert_eq!(tour.nodes(), &[0, 3, 1]);
    }

    #[test]
    fn test_substitute_keeps_slot() {
        let inst = scenario();
        let mut tour = Tour::from_nodes(&inst, 0, &[0, 2, 1]).expect("valid");
        AtomicEdit::Substitute { node: 2, by: 3 }
            .apply(&mut tour)
            .expect("valid");
        assert_eq!(tour.nodes(), &[0, 3, 1]);
    }

    #[test]
    fn test_display() {
        assert_eq!(AtomicEdit::Delete { node: 4 }.to_string(), "del(4)");
        assert_eq!(
            AtomicEdit::Substitute { node: 4, by: 5 }.to_string(),
            "sub(4 by 5)"
        );
    }
}
