//! Finite-state AI controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use enemy_domain::{AiState, EventDispatcher, PairMateDied, Subscription, UnitDied, UnitId};

use super::states::{self, Deps, Machine};
use super::{AiError, UnitAi};
use crate::infrastructure::ports::{AiContext, CombatLogic, MoveLogic};
use crate::infrastructure::settings::AiTuning;

const COMPONENT: &str = "AiController";

/// Scales the unit's movement and attack output.
///
/// Handed to composing controllers so their wiring can reach the mutators
/// without borrowing the controller itself.
#[derive(Clone)]
pub struct MultiplierHandle {
    movement: Arc<dyn MoveLogic>,
    combat: Arc<dyn CombatLogic>,
}

impl MultiplierHandle {
    pub fn set_speed_multiplier(&self, multiplier: f32) {
        self.movement.set_speed_multiplier(multiplier);
    }

    pub fn set_attack_multiplier(&self, multiplier: f32) {
        self.combat.set_attack_multiplier(multiplier);
    }
}

/// State shared with the death handlers
struct Core {
    deps: Arc<Deps>,
    machine: Mutex<Machine>,
    /// Set by death handlers; consumed under the machine lock
    pending_death: AtomicBool,
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_death(&self) {
        self.pending_death.store(true, Ordering::Release);
        match self.machine.try_lock() {
            Ok(mut machine) => self.apply_pending_death(&mut machine),
            Err(TryLockError::Poisoned(poisoned)) => {
                self.apply_pending_death(&mut poisoned.into_inner())
            }
            // Mid-tick (reentrant dispatch or another thread): the tick applies it
            Err(TryLockError::WouldBlock) => {}
        }
    }

    fn apply_pending_death(&self, machine: &mut Machine) {
        if !self.pending_death.swap(false, Ordering::AcqRel) || machine.state == AiState::Dead {
            return;
        }
        tracing::info!(unit_id = %machine.unit_id, from = %machine.state, "Unit AI forced to Dead");
        states::switch(machine, &self.deps, AiState::Dead);
    }

    fn tick(&self, dt: f32) {
        let mut machine = self.lock();
        self.apply_pending_death(&mut machine);
        if machine.state.is_terminal() {
            return;
        }

        self.deps.context.refresh(dt);
        let hooks = states::hooks(machine.state);
        (hooks.tick)(&mut machine, &self.deps, dt);
        if let Some(next) = (hooks.next)(&machine, &self.deps) {
            states::switch(&mut machine, &self.deps, next);
        }

        self.apply_pending_death(&mut machine);
    }
}

/// Per-unit AI state machine.
///
/// Starts in [`AiState::Idle`] once initialized. The unit's own death events
/// (`UnitDied` or `PairMateDied`) force it into [`AiState::Dead`] regardless
/// of the current state's guards; Dead is terminal.
pub struct AiController {
    deps: Arc<Deps>,
    dispatcher: EventDispatcher,
    core: Option<Arc<Core>>,
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

impl AiController {
    pub fn new(
        context: Arc<dyn AiContext>,
        movement: Arc<dyn MoveLogic>,
        combat: Arc<dyn CombatLogic>,
        dispatcher: EventDispatcher,
        tuning: AiTuning,
    ) -> Self {
        Self {
            deps: Arc::new(Deps {
                context,
                movement,
                combat,
                tuning,
            }),
            dispatcher,
            core: None,
            subscriptions: Vec::new(),
            disposed: false,
        }
    }

    pub fn multipliers(&self) -> MultiplierHandle {
        MultiplierHandle {
            movement: Arc::clone(&self.deps.movement),
            combat: Arc::clone(&self.deps.combat),
        }
    }

    pub fn unit_id(&self) -> Option<UnitId> {
        self.core.as_ref().map(|core| core.lock().unit_id)
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_some() && !self.disposed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn subscribe_death(&mut self, core: &Arc<Core>, unit_id: UnitId) {
        let weak = Arc::downgrade(core);
        self.subscriptions
            .push(self.dispatcher.register(move |e: &UnitDied| {
                if e.unit_id == unit_id {
                    if let Some(core) = weak.upgrade() {
                        core.request_death();
                    }
                }
            }));

        let weak = Arc::downgrade(core);
        self.subscriptions
            .push(self.dispatcher.register(move |e: &PairMateDied| {
                if e.unit_id == unit_id {
                    if let Some(core) = weak.upgrade() {
                        core.request_death();
                    }
                }
            }));
    }
}

impl UnitAi for AiController {
    fn initialize(&mut self, unit_id: UnitId) -> Result<(), AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        if self.core.is_some() {
            return Ok(());
        }

        let spawn_point = self.deps.movement.position();
        let core = Arc::new(Core {
            deps: Arc::clone(&self.deps),
            machine: Mutex::new(Machine::new(unit_id, spawn_point)),
            pending_death: AtomicBool::new(false),
        });
        self.subscribe_death(&core, unit_id);
        {
            let mut machine = core.lock();
            (states::hooks(machine.state).enter)(&mut machine, &self.deps);
        }

        tracing::debug!(unit_id = %unit_id, "AI controller initialized");
        self.core = Some(core);
        Ok(())
    }

    fn tick(&mut self, dt: f32) -> Result<(), AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        let core = self
            .core
            .as_ref()
            .ok_or_else(|| AiError::not_initialized(COMPONENT))?;
        core.tick(dt);
        Ok(())
    }

    fn state(&self) -> AiState {
        self.core
            .as_ref()
            .map_or(AiState::Idle, |core| core.lock().state)
    }

    fn set_speed_multiplier(&self, multiplier: f32) {
        self.deps.movement.set_speed_multiplier(multiplier);
    }

    fn set_attack_multiplier(&self, multiplier: f32) {
        self.deps.combat.set_attack_multiplier(multiplier);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for mut subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        if let Some(core) = &self.core {
            let mut machine = core.lock();
            (states::hooks(machine.state).exit)(&mut machine, &self.deps);
        }
    }
}
