//! Polled perception cache for the AI controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use enemy_domain::{Vec3, WorldEntityId};

use super::ports::{AiContext, NavigationPort, TargetSelector, WorldPort};

pub const DEFAULT_POLL_INTERVAL: f32 = 0.05;
pub const MIN_POLL_INTERVAL: f32 = 0.02;
const EYE_OFFSET: Vec3 = Vec3::new(0.0, 1.6, 0.0);

#[derive(Debug, Clone, Copy)]
struct Perception {
    timer: f32,
    target: Option<WorldEntityId>,
    self_position: Vec3,
    target_position: Option<Vec3>,
    distance: f32,
    line_of_sight: bool,
}

/// Caches target selection, distance and line of sight.
///
/// The world is queried once at construction and then at most once per poll
/// interval, never every frame.
pub struct CachedAiContext {
    world: Arc<dyn WorldPort>,
    body: Arc<dyn NavigationPort>,
    selector: Arc<dyn TargetSelector>,
    poll_interval: f32,
    cache: Mutex<Perception>,
}

impl CachedAiContext {
    /// `body` is the unit's own navigation agent; it supplies the self position.
    pub fn new(
        world: Arc<dyn WorldPort>,
        body: Arc<dyn NavigationPort>,
        selector: Arc<dyn TargetSelector>,
        poll_interval: f32,
    ) -> Self {
        let context = Self {
            world,
            body,
            selector,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            cache: Mutex::new(Perception {
                timer: 0.0,
                target: None,
                self_position: Vec3::ZERO,
                target_position: None,
                distance: f32::INFINITY,
                line_of_sight: false,
            }),
        };
        context.poll(&mut context.cache());
        context
    }

    pub fn poll_interval(&self) -> f32 {
        self.poll_interval
    }

    pub fn target(&self) -> Option<WorldEntityId> {
        self.cache().target
    }

    fn cache(&self) -> MutexGuard<'_, Perception> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll(&self, cache: &mut Perception) {
        let origin = self.body.position();
        let target = self.selector.select(self.world.as_ref(), origin);
        let target_position = target.and_then(|id| self.world.position_of(id));

        cache.target = target;
        cache.self_position = origin;
        cache.target_position = target_position;
        match target_position {
            Some(position) => {
                cache.distance = (origin + EYE_OFFSET).distance(position + EYE_OFFSET);
                cache.line_of_sight = !self.world.raycast_blocked(origin, position);
            }
            None => {
                cache.distance = f32::INFINITY;
                cache.line_of_sight = false;
            }
        }
    }
}

impl AiContext for CachedAiContext {
    fn refresh(&self, dt: f32) {
        let mut cache = self.cache();
        cache.timer += dt;
        if cache.timer < self.poll_interval {
            return;
        }
        cache.timer = 0.0;
        self.poll(&mut cache);
    }

    fn self_position(&self) -> Vec3 {
        self.cache().self_position
    }

    fn target_position(&self) -> Option<Vec3> {
        self.cache().target_position
    }

    fn distance_to_target(&self) -> f32 {
        self.cache().distance
    }

    fn has_line_of_sight(&self) -> bool {
        self.cache().line_of_sight
    }
}

/// Always picks the same world entity.
pub struct FixedTargetSelector(pub WorldEntityId);

impl TargetSelector for FixedTargetSelector {
    fn select(&self, world: &dyn WorldPort, _origin: Vec3) -> Option<WorldEntityId> {
        world.position_of(self.0).map(|_| self.0)
    }
}

/// Picks the closest of a fixed candidate list.
pub struct NearestTargetSelector {
    candidates: Vec<WorldEntityId>,
}

impl NearestTargetSelector {
    pub fn new(candidates: Vec<WorldEntityId>) -> Self {
        Self { candidates }
    }
}

impl TargetSelector for NearestTargetSelector {
    fn select(&self, world: &dyn WorldPort, origin: Vec3) -> Option<WorldEntityId> {
        self.candidates
            .iter()
            .filter_map(|id| world.position_of(*id).map(|p| (*id, origin.distance(p))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
