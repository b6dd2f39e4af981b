//! One-shot rage with fixed multipliers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use enemy_domain::UnitId;

use super::{Lifecycle, UnitBehavior};
use crate::use_cases::ai::AiError;

const COMPONENT: &str = "EnrageBehavior";

/// Receives the enraged unit's id
pub type EnrageListener = Arc<dyn Fn(UnitId) + Send + Sync>;

#[derive(Default)]
struct EnrageState {
    lifecycle: Lifecycle,
    enraged: bool,
}

/// Flips to enraged at most once and tells its listeners.
pub struct EnrageBehavior {
    speed_multiplier: f32,
    attack_multiplier: f32,
    state: Mutex<EnrageState>,
    listeners: Mutex<Vec<EnrageListener>>,
}

impl EnrageBehavior {
    pub fn new(speed_multiplier: f32, attack_multiplier: f32) -> Self {
        Self {
            speed_multiplier,
            attack_multiplier,
            state: Mutex::new(EnrageState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn attack_multiplier(&self) -> f32 {
        self.attack_multiplier
    }

    pub fn is_enraged(&self) -> bool {
        self.state().enraged
    }

    pub fn on_enrage_triggered(&self, listener: EnrageListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Enrage the unit. Only the first successful call notifies listeners;
    /// the returned flag says whether this call was it.
    pub fn trigger_enrage(&self) -> Result<bool, AiError> {
        let unit_id = {
            let mut state = self.state();
            if state.lifecycle.disposed {
                return Err(AiError::disposed(COMPONENT));
            }
            let Some(unit_id) = state.lifecycle.unit else {
                return Err(AiError::not_initialized(COMPONENT));
            };
            if state.enraged {
                return Ok(false);
            }
            state.enraged = true;
            unit_id
        };

        tracing::info!(
            unit_id = %unit_id,
            speed_multiplier = self.speed_multiplier,
            attack_multiplier = self.attack_multiplier,
            "Enrage triggered"
        );
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(unit_id);
        }
        Ok(true)
    }

    fn state(&self) -> MutexGuard<'_, EnrageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnitBehavior for EnrageBehavior {
    fn is_initialized(&self) -> bool {
        self.state().lifecycle.active_unit().is_some()
    }

    fn initialize(&self, unit_id: UnitId) -> Result<(), AiError> {
        self.state().lifecycle.bind(unit_id, COMPONENT).map(|_| ())
    }

    fn update(&self, _dt: f32) {}

    fn dispose(&self) {
        self.state().lifecycle.disposed = true;
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
