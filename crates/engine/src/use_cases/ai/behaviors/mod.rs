//! Event-driven add-ons layered onto a base controller.
//!
//! Behaviors never touch controller internals. They raise notifications;
//! the composing controller decides what those notifications do.

mod enrage;
mod pair;

pub use enrage::{EnrageBehavior, EnrageListener};
pub use pair::{PairBehavior, PairListener};

use enemy_domain::UnitId;

use super::AiError;

/// Shared lifecycle of a behavior.
#[cfg_attr(test, mockall::automock)]
pub trait UnitBehavior: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// Bind to `unit_id`. Idempotent; fails after [`UnitBehavior::dispose`].
    fn initialize(&self, unit_id: UnitId) -> Result<(), AiError>;

    /// Per-frame hook.
    fn update(&self, dt: f32);

    /// Idempotent.
    fn dispose(&self);
}

/// Lifecycle flags shared by the behaviors in this module
#[derive(Debug, Default, Clone, Copy)]
struct Lifecycle {
    unit: Option<UnitId>,
    disposed: bool,
}

impl Lifecycle {
    fn bind(&mut self, unit_id: UnitId, component: &'static str) -> Result<bool, AiError> {
        if self.disposed {
            return Err(AiError::disposed(component));
        }
        if self.unit.is_some() {
            return Ok(false);
        }
        self.unit = Some(unit_id);
        Ok(true)
    }

    fn active_unit(&self) -> Option<UnitId> {
        if self.disposed {
            None
        } else {
            self.unit
        }
    }
}
