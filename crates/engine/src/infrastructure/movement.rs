//! Move logic on top of a navigation agent.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use enemy_domain::Vec3;

use super::ports::{MoveLogic, NavigationPort};
use super::settings::Accessor;

const FULL_SPEED_ANGLE: f32 = PI / 6.0;
const STOP_ANGLE: f32 = PI / 3.0;
/// Radians per second
const TURN_RATE: f32 = PI;
const ANGLE_EPSILON: f32 = 0.001;

/// Fraction of full speed allowed while facing `angle` radians off the path.
///
/// 1.0 up to 30 degrees, falling linearly to 0.0 at 60 degrees and beyond.
pub fn turn_speed_factor(angle: f32) -> f32 {
    if angle >= STOP_ANGLE {
        0.0
    } else if angle > FULL_SPEED_ANGLE {
        1.0 - (angle - FULL_SPEED_ANGLE) / (STOP_ANGLE - FULL_SPEED_ANGLE)
    } else {
        1.0
    }
}

struct MoveState {
    speed_multiplier: f32,
    current_speed: f32,
    disposed: bool,
}

/// Steers a [`NavigationPort`] agent at the configured speed.
///
/// The unit slows down while turning sharply and eases its heading towards
/// the path direction.
pub struct NavigationMoveLogic {
    navigator: Arc<dyn NavigationPort>,
    base_speed: Accessor<f32>,
    state: Mutex<MoveState>,
}

impl NavigationMoveLogic {
    pub fn new(base_speed: Accessor<f32>, navigator: Arc<dyn NavigationPort>) -> Self {
        Self {
            navigator,
            base_speed,
            state: Mutex::new(MoveState {
                speed_multiplier: 1.0,
                current_speed: 0.0,
                disposed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MoveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MoveLogic for NavigationMoveLogic {
    fn move_to(&self, destination: Vec3) {
        if self.state().disposed {
            return;
        }
        self.navigator.set_destination(destination);
    }

    fn stop(&self) {
        self.navigator.stop();
        self.state().current_speed = 0.0;
    }

    fn has_arrived(&self) -> bool {
        self.navigator.has_arrived()
    }

    fn position(&self) -> Vec3 {
        self.navigator.position()
    }

    fn set_speed_multiplier(&self, multiplier: f32) {
        self.state().speed_multiplier = multiplier;
    }

    fn speed_multiplier(&self) -> f32 {
        self.state().speed_multiplier
    }

    fn current_speed(&self) -> f32 {
        self.state().current_speed
    }

    fn tick(&self, dt: f32) {
        let mut state = self.state();
        if state.disposed {
            return;
        }

        self.navigator.update(dt);
        let direction = self.navigator.desired_velocity().flatten().normalize_or_zero();
        if direction.is_zero() {
            state.current_speed = 0.0;
            return;
        }

        let angle = self.navigator.forward().flatten().angle_between(direction);
        let speed = (self.base_speed)() * state.speed_multiplier * turn_speed_factor(angle);
        state.current_speed = speed;
        drop(state);

        if speed > 0.0 {
            self.navigator.apply_displacement(direction * (speed * dt));
        }
        if angle > ANGLE_EPSILON {
            let t = (TURN_RATE * dt / angle).clamp(0.0, 1.0);
            let eased = 1.0 - (1.0 - t).powi(2);
            self.navigator.rotate_towards(direction, angle * eased);
        }
    }

    fn dispose(&self) {
        let mut state = self.state();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.current_speed = 0.0;
        drop(state);
        self.navigator.stop();
    }
}
