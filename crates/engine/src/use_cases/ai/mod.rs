//! Unit AI: the state machine controller and the behaviors composed onto it.

pub mod behaviors;
mod controller;
mod error;
mod paired;
mod states;

pub use controller::{AiController, MultiplierHandle};
pub use error::AiError;
pub use paired::PairedAiController;
pub use states::{HOME_TOLERANCE, IDLE_DURATION};

use enemy_domain::{AiState, UnitId};

/// What the unit service drives each frame.
#[cfg_attr(test, mockall::automock)]
pub trait UnitAi: Send {
    /// Bind to the unit and subscribe to its events. Idempotent.
    fn initialize(&mut self, unit_id: UnitId) -> Result<(), AiError>;
    fn tick(&mut self, dt: f32) -> Result<(), AiError>;
    fn state(&self) -> AiState;
    fn set_speed_multiplier(&self, multiplier: f32);
    fn set_attack_multiplier(&self, multiplier: f32);
    /// Idempotent.
    fn dispose(&mut self);
}
