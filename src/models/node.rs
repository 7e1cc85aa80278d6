//! Node and time window types.

/// Identifier of a node (request or depot visit) in an [`Instance`](super::Instance).
pub type NodeId = usize;

/// A time window constraint on the arrival at a node.
///
/// The resource must arrive no later than `due` and may arrive as early as
/// it likes, in which case it waits until `ready` before starting service.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::TimeWindow;
///
/// let tw = TimeWindow::new(100.0, 200.0).unwrap();
/// assert!(tw.contains(150.0));
/// assert_eq!(tw.waiting_time(80.0), 20.0);
/// assert_eq!(tw.start_of_service(80.0), 100.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    ready: f64,
    due: f64,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// Returns `None` if `ready > due` or either value is non-finite.
    pub fn new(ready: f64, due: f64) -> Option<Self> {
        if !ready.is_finite() || !due.is_finite() || ready > due {
            return None;
        }
        Some(Self { ready, due })
    }

    /// A window that never constrains the arrival: `[0, +inf)`.
    pub fn unbounded() -> Self {
        Self {
            ready: 0.0,
            due: f64::INFINITY,
        }
    }

    /// Earliest start of service.
    pub fn ready(&self) -> f64 {
        self.ready
    }

    /// Latest allowable arrival time.
    pub fn due(&self) -> f64 {
        self.due
    }

    /// Returns `true` if the given time falls within this window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.ready && time <= self.due
    }

    /// Returns the waiting time if arriving at the given time.
    ///
    /// Zero if the resource arrives within or after the window.
    pub fn waiting_time(&self, arrival: f64) -> f64 {
        if arrival < self.ready {
            self.ready - arrival
        } else {
            0.0
        }
    }

    /// Earliest start of service when arriving at `arrival`.
    pub fn start_of_service(&self, arrival: f64) -> f64 {
        arrival.max(self.ready)
    }

    /// Returns `true` if arriving at the given time violates this window.
    pub fn is_violated(&self, arrival: f64) -> bool {
        arrival > self.due
    }
}

/// A location visited by tours: a request or a depot.
///
/// Depots are ordinary nodes. A resource's start and end depots are two
/// distinct nodes placed at the same location so that both can appear in
/// the same tour.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::{Node, TimeWindow};
///
/// let n = Node::new(3, 10.0, 20.0, 5.0)
///     .with_time_window(TimeWindow::new(10.0, 20.0).unwrap());
/// assert_eq!(n.id(), 3);
/// assert_eq!(n.service_time(), 5.0);
/// assert_eq!(n.window().due(), 20.0);
/// ```
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    x: f64,
    y: f64,
    service_time: f64,
    time_window: Option<TimeWindow>,
}

impl Node {
    /// Creates a new node without time window.
    pub fn new(id: NodeId, x: f64, y: f64, service_time: f64) -> Self {
        Self {
            id,
            x,
            y,
            service_time,
            time_window: None,
        }
    }

    /// Creates a depot node (no service time).
    pub fn depot(id: NodeId, x: f64, y: f64) -> Self {
        Self::new(id, x, y, 0.0)
    }

    /// Sets a time window for this node.
    pub fn with_time_window(mut self, tw: TimeWindow) -> Self {
        self.time_window = Some(tw);
        self
    }

    /// Node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// X-coordinate.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Service duration at this node.
    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    /// Time window constraint, if any.
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Time window constraint, unbounded if none was set.
    pub fn window(&self) -> TimeWindow {
        self.time_window.unwrap_or_else(TimeWindow::unbounded)
    }

    /// Euclidean distance to another node.
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_invalid() {
        assert!(TimeWindow::new(20.0, 10.0).is_none());
        assert!(TimeWindow::new(f64::NAN, 10.0).is_none());
        assert!(TimeWindow::new(10.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_time_window_waiting_and_service_start() {
        let tw = TimeWindow::new(10.0, 20.0).expect("valid");
        assert!((tw.waiting_time(5.0) - 5.0).abs() < 1e-10);
        assert!(tw.waiting_time(15.0).abs() < 1e-10);
        assert_eq!(tw.start_of_service(5.0), 10.0);
        assert_eq!(tw.start_of_service(12.0), 12.0);
        assert!(!tw.is_violated(20.0));
        assert!(tw.is_violated(20.1));
    }

    #[test]
    fn test_unbounded_window() {
        let tw = TimeWindow::unbounded();
        assert!(tw.contains(1e12));
        assert_eq!(tw.waiting_time(0.0), 0.0);
        assert!(!tw.is_violated(f64::MAX));
    }

    #[test]
    fn test_node_without_window_is_unbounded() {
        let n = Node::new(1, 0.0, 0.0, 3.0);
        assert!(n.time_window().is_none());
        assert_eq!(n.window(), TimeWindow::unbounded());
    }

    #[test]
    fn test_node_distance() {
        let a = Node::depot(0, 0.0, 0.0);
        let b = Node::new(1, 3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }
}
