//! Single-shot attack with a fixed cooldown.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ports::{AttackListener, CombatLogic};
use super::settings::Accessor;

struct CombatState {
    attack_multiplier: f32,
    cooldown_timer: f32,
    listener: Option<AttackListener>,
    disposed: bool,
}

/// Cooldown-gated combat logic.
///
/// Attack power and cooldown length are read through accessors at the moment
/// they are needed, so tuning changes apply to the next attack. A cooldown
/// already running keeps its remaining time.
pub struct SimpleCombatLogic {
    attack_power: Accessor<i32>,
    cooldown_seconds: Accessor<f32>,
    state: Mutex<CombatState>,
}

impl SimpleCombatLogic {
    pub fn new(attack_power: Accessor<i32>, cooldown_seconds: Accessor<f32>) -> Self {
        Self {
            attack_power,
            cooldown_seconds,
            state: Mutex::new(CombatState {
                attack_multiplier: 1.0,
                cooldown_timer: 0.0,
                listener: None,
                disposed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CombatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CombatLogic for SimpleCombatLogic {
    fn is_ready(&self) -> bool {
        self.state().cooldown_timer <= 0.0
    }

    fn use_attack(&self) -> bool {
        let listener = {
            let mut state = self.state();
            if state.disposed || state.cooldown_timer > 0.0 {
                return false;
            }
            state.cooldown_timer = (self.cooldown_seconds)().max(0.0);
            state.listener.clone()
        };

        tracing::trace!(damage = self.calc_damage(), "Attack fired");
        // Outside the lock: the listener may query this logic again
        if let Some(listener) = listener {
            listener();
        }
        true
    }

    fn tick(&self, dt: f32) {
        let mut state = self.state();
        if state.cooldown_timer > 0.0 {
            state.cooldown_timer = (state.cooldown_timer - dt).max(0.0);
        }
    }

    fn set_attack_multiplier(&self, multiplier: f32) {
        self.state().attack_multiplier = multiplier;
    }

    fn attack_multiplier(&self) -> f32 {
        self.state().attack_multiplier
    }

    fn calc_damage(&self) -> i32 {
        let multiplier = self.state().attack_multiplier;
        ((self.attack_power)() as f32 * multiplier).floor() as i32
    }

    fn remaining_cooldown(&self) -> f32 {
        self.state().cooldown_timer
    }

    fn set_attack_listener(&self, listener: Option<AttackListener>) {
        let mut state = self.state();
        if state.disposed && listener.is_some() {
            tracing::warn!("Attack listener set on disposed combat logic ignored");
            return;
        }
        state.listener = listener;
    }

    fn dispose(&self) {
        let mut state = self.state();
        state.listener = None;
        state.disposed = true;
    }
}
