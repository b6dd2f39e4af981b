//! One spawned unit as a single tickable object.

use std::sync::Arc;

use enemy_domain::{
    AiState, AttackPerformed, ClockPort, DamageOutcome, EventDispatcher, UnitEntity, UnitId,
    UnitKind, UnitStatus,
};

use crate::infrastructure::ports::{CombatLogic, MoveLogic};
use crate::use_cases::ai::{AiError, UnitAi};

const COMPONENT: &str = "UnitService";

/// Composes entity, move logic, combat logic and AI for one unit.
///
/// Per frame the AI decides first, then movement and combat execute, so the
/// AI always sees the previous frame's position and cooldown. Accepted
/// attacks are republished as `AttackPerformed`.
pub struct UnitService {
    entity: UnitEntity,
    movement: Arc<dyn MoveLogic>,
    combat: Arc<dyn CombatLogic>,
    ai: Box<dyn UnitAi>,
    disposed: bool,
}

impl UnitService {
    /// Initialize `ai` for the entity and hook the attack callback.
    ///
    /// If the AI fails to initialize, move and combat logic are disposed and
    /// the error is returned.
    pub fn new(
        entity: UnitEntity,
        movement: Arc<dyn MoveLogic>,
        combat: Arc<dyn CombatLogic>,
        mut ai: Box<dyn UnitAi>,
        dispatcher: &EventDispatcher,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Self, AiError> {
        let unit_id = entity.id();
        if let Err(e) = ai.initialize(unit_id) {
            movement.dispose();
            combat.dispose();
            return Err(e);
        }

        let events = dispatcher.downgrade();
        combat.set_attack_listener(Some(Arc::new(move || {
            events.dispatch(AttackPerformed {
                unit_id,
                occurred_at: clock.now(),
            });
        })));

        tracing::info!(unit_id = %unit_id, kind = ?entity.kind(), "Unit spawned");
        Ok(Self {
            entity,
            movement,
            combat,
            ai,
            disposed: false,
        })
    }

    pub fn id(&self) -> UnitId {
        self.entity.id()
    }

    pub fn kind(&self) -> UnitKind {
        self.entity.kind()
    }

    pub fn status(&self) -> UnitStatus {
        self.entity.status()
    }

    pub fn ai_state(&self) -> AiState {
        self.ai.state()
    }

    pub fn current_speed(&self) -> f32 {
        self.movement.current_speed()
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.movement.speed_multiplier()
    }

    pub fn attack_multiplier(&self) -> f32 {
        self.combat.attack_multiplier()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Advance one frame: AI, then movement, then combat.
    pub fn tick(&mut self, dt: f32) -> Result<(), AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        self.ai.tick(dt)?;
        self.movement.tick(dt);
        self.combat.tick(dt);
        Ok(())
    }

    /// Damage the unit. Disposed units ignore damage.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.disposed {
            tracing::debug!(unit_id = %self.id(), amount, "Damage on disposed unit ignored");
            return DamageOutcome::Ignored;
        }
        self.entity.apply_damage(amount)
    }

    pub fn restore_full_hp(&mut self) {
        self.entity.restore_full_hp();
    }

    /// Release everything in reverse acquisition order. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.combat.set_attack_listener(None);
        self.movement.dispose();
        self.combat.dispose();
        self.ai.dispose();
        tracing::debug!(unit_id = %self.id(), "Unit disposed");
    }
}

impl Drop for UnitService {
    fn drop(&mut self) {
        self.dispose();
    }
}
