//! Spatial ports: navigation agent and world queries.

use enemy_domain::{Vec3, WorldEntityId};

/// Navigation agent of one unit (path following lives behind this port).
///
/// A failed path request is retried with exponential backoff. Once the
/// retries are used up the agent gives up silently: it never reports
/// arrival and wants no movement until it gets a new destination.
#[cfg_attr(test, mockall::automock)]
pub trait NavigationPort: Send + Sync {
    fn position(&self) -> Vec3;
    fn forward(&self) -> Vec3;
    fn right(&self) -> Vec3;
    fn up(&self) -> Vec3;
    fn set_destination(&self, destination: Vec3);
    /// Follow a world entity instead of a fixed point.
    fn set_target(&self, target: WorldEntityId);
    fn stop(&self);
    /// Advance path bookkeeping (retry timers) by `dt` seconds.
    fn update(&self, dt: f32);
    /// Destination reached (or no destination set).
    fn has_arrived(&self) -> bool;
    /// Unscaled direction the agent wants to move this frame.
    fn desired_velocity(&self) -> Vec3;
    fn apply_displacement(&self, delta: Vec3);
    /// Turn the heading towards `direction` by at most `max_radians`.
    fn rotate_towards(&self, direction: Vec3, max_radians: f32);
}

/// Positions and line-of-sight raycasts against the host world.
#[cfg_attr(test, mockall::automock)]
pub trait WorldPort: Send + Sync {
    fn position_of(&self, entity: WorldEntityId) -> Option<Vec3>;
    /// True when something blocks the segment `from -> to`.
    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool;
}

/// Target selection policy used by the AI context on each refresh.
#[cfg_attr(test, mockall::automock)]
pub trait TargetSelector: Send + Sync {
    fn select(&self, world: &dyn WorldPort, origin: Vec3) -> Option<WorldEntityId>;
}
