//! Test fixtures: JSON settings files and hand-driven port fakes.
//!
//! The fakes record what the AI asks of them and let tests script what it
//! perceives, which reads better than long mockall expectation chains for
//! multi-tick scenarios.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use enemy_domain::Vec3;

use crate::infrastructure::ports::{AiContext, MoveLogic};

// =============================================================================
// Fixture Loading
// =============================================================================

/// Path of a file under the crate's `test_data/` directory.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(name)
}

// =============================================================================
// Perception
// =============================================================================

struct Perception {
    self_position: Vec3,
    target: Option<Vec3>,
    distance: f32,
}

/// [`AiContext`] whose answers are set by the test.
pub struct ScriptedContext {
    perception: Mutex<Perception>,
}

impl ScriptedContext {
    /// No target, standing at the origin.
    pub fn new() -> Self {
        Self {
            perception: Mutex::new(Perception {
                self_position: Vec3::ZERO,
                target: None,
                distance: f32::INFINITY,
            }),
        }
    }

    pub fn set_target(&self, position: Vec3, distance: f32) {
        let mut p = self.perception();
        p.target = Some(position);
        p.distance = distance;
    }

    pub fn clear_target(&self) {
        let mut p = self.perception();
        p.target = None;
        p.distance = f32::INFINITY;
    }

    pub fn set_self_position(&self, position: Vec3) {
        self.perception().self_position = position;
    }

    fn perception(&self) -> MutexGuard<'_, Perception> {
        self.perception.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AiContext for ScriptedContext {
    fn refresh(&self, _dt: f32) {}

    fn self_position(&self) -> Vec3 {
        self.perception().self_position
    }

    fn target_position(&self) -> Option<Vec3> {
        self.perception().target
    }

    fn distance_to_target(&self) -> f32 {
        self.perception().distance
    }

    fn has_line_of_sight(&self) -> bool {
        self.perception().target.is_some()
    }
}

// =============================================================================
// Movement
// =============================================================================

struct MovementLog {
    destinations: Vec<Vec3>,
    arrived: bool,
    stops: usize,
    speed_multiplier: f32,
}

/// [`MoveLogic`] that never moves, only records.
///
/// Reports arrival by default so patrol waits run without scripting.
pub struct RecordingMovement {
    position: Vec3,
    log: Mutex<MovementLog>,
}

impl RecordingMovement {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            log: Mutex::new(MovementLog {
                destinations: Vec::new(),
                arrived: true,
                stops: 0,
                speed_multiplier: 1.0,
            }),
        }
    }

    pub fn destinations(&self) -> Vec<Vec3> {
        self.log().destinations.clone()
    }

    pub fn last_destination(&self) -> Option<Vec3> {
        self.log().destinations.last().copied()
    }

    pub fn set_arrived(&self, arrived: bool) {
        self.log().arrived = arrived;
    }

    pub fn stop_count(&self) -> usize {
        self.log().stops
    }

    fn log(&self) -> MutexGuard<'_, MovementLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MoveLogic for RecordingMovement {
    fn move_to(&self, destination: Vec3) {
        self.log().destinations.push(destination);
    }

    fn stop(&self) {
        self.log().stops += 1;
    }

    fn has_arrived(&self) -> bool {
        self.log().arrived
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_speed_multiplier(&self, multiplier: f32) {
        self.log().speed_multiplier = multiplier;
    }

    fn speed_multiplier(&self) -> f32 {
        self.log().speed_multiplier
    }

    fn current_speed(&self) -> f32 {
        0.0
    }

    fn tick(&self, _dt: f32) {}

    fn dispose(&self) {}
}
