//! Headless world and navigation adapters.
//!
//! Used by the `enemy-sim` binary and scenario tests in place of a host
//! engine: straight-line movement on the ground plane, spherical occluders,
//! and blocked areas that no path can end in.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use enemy_domain::{Vec3, WorldEntityId};

use super::ports::{NavigationPort, WorldPort};
use super::settings::NavigationSettings;

pub const DEFAULT_ARRIVAL_RADIUS: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
struct Occluder {
    center: Vec3,
    radius: f32,
}

/// In-memory entity positions
#[derive(Default)]
pub struct SimWorld {
    positions: RwLock<HashMap<WorldEntityId, Vec3>>,
    occluders: RwLock<Vec<Occluder>>,
    blocked: RwLock<Vec<Occluder>>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, position: Vec3) -> WorldEntityId {
        let id = WorldEntityId::new();
        self.set_position(id, position);
        id
    }

    pub fn set_position(&self, entity: WorldEntityId, position: Vec3) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity, position);
    }

    pub fn despawn(&self, entity: WorldEntityId) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entity);
    }

    /// Block line of sight through a sphere.
    pub fn add_occluder(&self, center: Vec3, radius: f32) {
        self.occluders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Occluder { center, radius });
    }

    /// Make every point within `radius` of `center` unreachable for path requests.
    pub fn add_blocked_area(&self, center: Vec3, radius: f32) {
        self.blocked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Occluder { center, radius });
    }

    pub fn clear_blocked_areas(&self) {
        self.blocked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_reachable(&self, point: Vec3) -> bool {
        !self
            .blocked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|area| point.flatten().distance(area.center.flatten()) <= area.radius)
    }
}

impl WorldPort for SimWorld {
    fn position_of(&self, entity: WorldEntityId) -> Option<Vec3> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .copied()
    }

    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let segment = to - from;
        let length_sq = segment.dot(segment);
        self.occluders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|o| {
                let t = if length_sq > 0.0 {
                    ((o.center - from).dot(segment) / length_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let closest = from + segment * t;
                closest.distance(o.center) <= o.radius
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum Destination {
    Point(Vec3),
    Entity(WorldEntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PathState {
    Idle,
    Following,
    /// Last request failed; the next one goes out in `retry_in` seconds
    Retrying { retry_in: f32 },
    /// Retries exhausted. Stays here until a new destination or a stop.
    Abandoned,
}

struct Agent {
    position: Vec3,
    forward: Vec3,
    destination: Option<Destination>,
    path: PathState,
    failures: u32,
    requests: u32,
}

/// Straight-line navigation agent mirrored into a [`SimWorld`].
///
/// Path requests fail when the goal lies in a blocked area or the followed
/// entity is gone. Failures are retried after [`NavigationSettings::retry_delay`]
/// until `max_retries` is exceeded.
pub struct SimNavigator {
    world: Arc<SimWorld>,
    entity: WorldEntityId,
    arrival_radius: f32,
    retry: NavigationSettings,
    agent: Mutex<Agent>,
}

impl SimNavigator {
    /// Spawn a new agent entity at `position`, facing +Z.
    pub fn spawn(world: Arc<SimWorld>, position: Vec3) -> Self {
        let entity = world.spawn(position);
        Self {
            world,
            entity,
            arrival_radius: DEFAULT_ARRIVAL_RADIUS,
            retry: NavigationSettings::default(),
            agent: Mutex::new(Agent {
                position,
                forward: Vec3::FORWARD,
                destination: None,
                path: PathState::Idle,
                failures: 0,
                requests: 0,
            }),
        }
    }

    pub fn with_retry(mut self, retry: NavigationSettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn entity(&self) -> WorldEntityId {
        self.entity
    }

    /// Current goal, resolved against the world for entity targets.
    pub fn destination(&self) -> Option<Vec3> {
        let agent = self.agent();
        self.resolve(&agent)
    }

    /// Path requests issued so far, retries included.
    pub fn path_requests(&self) -> u32 {
        self.agent().requests
    }

    pub fn has_given_up(&self) -> bool {
        self.agent().path == PathState::Abandoned
    }

    fn agent(&self) -> MutexGuard<'_, Agent> {
        self.agent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, agent: &Agent) -> Option<Vec3> {
        match agent.destination? {
            Destination::Point(point) => Some(point),
            Destination::Entity(entity) => self.world.position_of(entity),
        }
    }

    fn arrived(&self, agent: &Agent) -> bool {
        if agent.destination.is_none() {
            return true;
        }
        self.resolve(agent).is_some_and(|d| {
            agent.position.flatten().distance(d.flatten()) <= self.arrival_radius
        })
    }

    fn navigate(&self, agent: &mut Agent, destination: Destination) {
        agent.destination = Some(destination);
        agent.failures = 0;
        self.request_path(agent);
    }

    fn request_path(&self, agent: &mut Agent) {
        agent.requests += 1;
        match self.resolve(agent) {
            Some(goal) if self.world.is_reachable(goal) => {
                agent.failures = 0;
                agent.path = PathState::Following;
            }
            _ => self.path_failed(agent),
        }
    }

    fn path_failed(&self, agent: &mut Agent) {
        agent.failures += 1;
        if agent.failures > self.retry.max_retries {
            tracing::warn!(
                entity = %self.entity,
                failures = agent.failures,
                "Path retries exhausted; giving up"
            );
            agent.path = PathState::Abandoned;
            return;
        }
        let retry_in = self.retry.retry_delay(agent.failures);
        tracing::debug!(
            entity = %self.entity,
            failures = agent.failures,
            retry_in,
            "Path request failed; retrying"
        );
        agent.path = PathState::Retrying { retry_in };
    }
}

fn yaw(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

impl NavigationPort for SimNavigator {
    fn position(&self) -> Vec3 {
        self.agent().position
    }

    fn forward(&self) -> Vec3 {
        self.agent().forward
    }

    fn right(&self) -> Vec3 {
        self.up().cross(self.forward())
    }

    /// Agents only ever yaw.
    fn up(&self) -> Vec3 {
        Vec3::UP
    }

    fn set_destination(&self, destination: Vec3) {
        let mut agent = self.agent();
        self.navigate(&mut agent, Destination::Point(destination));
    }

    fn set_target(&self, target: WorldEntityId) {
        let mut agent = self.agent();
        self.navigate(&mut agent, Destination::Entity(target));
    }

    fn stop(&self) {
        let mut agent = self.agent();
        agent.destination = None;
        agent.path = PathState::Idle;
        agent.failures = 0;
    }

    fn update(&self, dt: f32) {
        let mut agent = self.agent();
        let path = agent.path;
        match path {
            // Followed entity vanished mid-path
            PathState::Following if self.resolve(&agent).is_none() => {
                self.path_failed(&mut agent);
            }
            PathState::Retrying { retry_in } => {
                let retry_in = retry_in - dt;
                if retry_in > 0.0 {
                    agent.path = PathState::Retrying { retry_in };
                } else {
                    self.request_path(&mut agent);
                }
            }
            _ => {}
        }
    }

    fn has_arrived(&self) -> bool {
        let agent = self.agent();
        self.arrived(&agent)
    }

    fn desired_velocity(&self) -> Vec3 {
        let agent = self.agent();
        if agent.path != PathState::Following || self.arrived(&agent) {
            return Vec3::ZERO;
        }
        self.resolve(&agent)
            .map_or(Vec3::ZERO, |d| (d - agent.position).flatten().normalize_or_zero())
    }

    fn apply_displacement(&self, delta: Vec3) {
        let position = {
            let mut agent = self.agent();
            // Never overshoot the destination
            let delta = match self.resolve(&agent) {
                Some(d) => {
                    let remaining = (d - agent.position).flatten();
                    if delta.length() > remaining.length() {
                        remaining
                    } else {
                        delta
                    }
                }
                None => delta,
            };
            agent.position += delta;
            agent.position
        };
        self.world.set_position(self.entity, position);
    }

    fn rotate_towards(&self, direction: Vec3, max_radians: f32) {
        let direction = direction.flatten();
        if direction.is_zero() {
            return;
        }
        let mut agent = self.agent();
        let current = yaw(agent.forward);
        let mut diff = yaw(direction) - current;
        if diff > PI {
            diff -= 2.0 * PI;
        } else if diff < -PI {
            diff += 2.0 * PI;
        }
        let next = current + diff.clamp(-max_radians, max_radians);
        agent.forward = Vec3::new(next.sin(), 0.0, next.cos());
    }
}
