//! Resource (technician or vehicle) type.

use super::NodeId;

/// A technician or vehicle that performs one tour.
///
/// Its tours start at the `home` node and end at the `end` node. Both
/// usually stand for the same depot location but are distinct nodes.
///
/// # Examples
///
/// ```
/// use u_route_cost::models::Resource;
///
/// let r = Resource::new(0, 0, 1).with_speed(2.0);
/// assert_eq!(r.home(), 0);
/// assert_eq!(r.end(), 1);
/// assert_eq!(r.speed(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Resource {
    id: usize,
    home: NodeId,
    end: NodeId,
    speed: f64,
}

impl Resource {
    /// Creates a resource with unit speed.
    pub fn new(id: usize, home: NodeId, end: NodeId) -> Self {
        Self {
            id,
            home,
            end,
            speed: 1.0,
        }
    }

    /// Sets the travel speed (distance units per time unit).
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Resource ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Node at which tours start.
    pub fn home(&self) -> NodeId {
        self.home
    }

    /// Node at which tours end.
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Travel speed.
    pub fn speed(&self) -> f64 {
        self.speed
    }
}
