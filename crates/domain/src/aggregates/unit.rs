//! Unit aggregate - health and rage lifecycle of one hostile unit
//!
//! # Rustic DDD Design
//!
//! - **Private fields**: status is only changed through [`UnitEntity::apply_damage`]
//! - **Tagged variant**: [`UnitKind`] picks the death event instead of subclassing
//! - **Domain events**: every state change is published on the dispatcher and
//!   also returned to the caller as a [`DamageOutcome`]
//! - **Valid by construction**: `new()` rejects bad max HP and thresholds

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::events::{
    DomainEvent, EventDispatcher, PairMateDied, UnitDamaged, UnitDied, UnitEnraged,
};
use crate::ports::ClockPort;
use crate::value_objects::UnitStatus;
use crate::{DomainError, PairId, UnitId};

/// Which death event a unit reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Reports [`UnitDied`]
    Standard,
    /// Reports [`PairMateDied`] so the partner sharing `pair_id` can react
    Paired { pair_id: PairId },
}

impl UnitKind {
    pub fn pair_id(&self) -> Option<PairId> {
        match self {
            Self::Standard => None,
            Self::Paired { pair_id } => Some(*pair_id),
        }
    }

    fn death_event(&self, unit_id: UnitId, occurred_at: DateTime<Utc>) -> DomainEvent {
        match self {
            Self::Standard => UnitDied {
                unit_id,
                occurred_at,
            }
            .into(),
            Self::Paired { pair_id } => PairMateDied {
                unit_id,
                pair_id: *pair_id,
                occurred_at,
            }
            .into(),
        }
    }
}

/// Result of [`UnitEntity::apply_damage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Amount was not positive; nothing changed
    Ignored,
    /// Unit survived the hit
    Wounded {
        damage: i32,
        hp_after: i32,
        /// This hit crossed the enrage threshold
        enraged: bool,
    },
    /// HP is 0 after the hit
    Killed { damage: i32 },
}

/// One spawned hostile unit.
///
/// # Invariants
///
/// - `0 <= current_hp <= max_hp` (enforced by [`UnitStatus`])
/// - Enrage flips at most once and never reverts (except via `restore_full_hp`)
/// - The death event is published exactly once, when HP first reaches 0
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{DateTime, Utc};
/// use enemy_domain::{ClockPort, DamageOutcome, EventDispatcher, UnitEntity, UnitId, UnitKind};
///
/// struct Now;
/// impl ClockPort for Now {
///     fn now(&self) -> DateTime<Utc> { Utc::now() }
/// }
///
/// let mut unit = UnitEntity::new(
///     UnitId::new(), UnitKind::Standard, 100, 0.3, EventDispatcher::new(), Arc::new(Now),
/// ).unwrap();
///
/// assert_eq!(
///     unit.apply_damage(71),
///     DamageOutcome::Wounded { damage: 71, hp_after: 29, enraged: true },
/// );
/// assert!(unit.status().is_enraged());
/// ```
pub struct UnitEntity {
    id: UnitId,
    kind: UnitKind,
    status: UnitStatus,
    enrage_threshold: f32,
    death_reported: bool,
    dispatcher: EventDispatcher,
    clock: Arc<dyn ClockPort>,
}

impl UnitEntity {
    /// Create a full-health unit.
    ///
    /// `enrage_threshold` is an HP ratio in `[0, 1]`; the unit enrages when
    /// its ratio drops strictly below it.
    pub fn new(
        id: UnitId,
        kind: UnitKind,
        max_hp: i32,
        enrage_threshold: f32,
        dispatcher: EventDispatcher,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&enrage_threshold) {
            return Err(DomainError::validation(format!(
                "enrage_threshold must be within [0, 1], got {}",
                enrage_threshold
            )));
        }
        let status = UnitStatus::full(max_hp)?;

        Ok(Self {
            id,
            kind,
            status,
            enrage_threshold,
            death_reported: false,
            dispatcher,
            clock,
        })
    }

    #[inline]
    pub fn id(&self) -> UnitId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    #[inline]
    pub fn status(&self) -> UnitStatus {
        self.status
    }

    #[inline]
    pub fn enrage_threshold(&self) -> f32 {
        self.enrage_threshold
    }

    /// Apply incoming damage.
    ///
    /// Non-positive amounts are ignored. Otherwise publishes, in order:
    /// `UnitDamaged`, then `UnitEnraged` if the threshold was crossed, then
    /// the kind's death event if HP reached 0.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 {
            return DamageOutcome::Ignored;
        }

        self.status = self.status.with_damage(amount);
        let hp_after = self.status.current_hp();
        let now = self.clock.now();

        self.dispatcher.dispatch(UnitDamaged {
            unit_id: self.id,
            damage: amount,
            hp_after,
            occurred_at: now,
        });

        let mut enraged = false;
        if !self.status.is_enraged()
            && hp_after > 0
            && self.status.hp_ratio() < self.enrage_threshold
        {
            self.status = self.status.enraged();
            enraged = true;
            tracing::info!(unit_id = %self.id, hp_after, "Unit enraged");
            self.dispatcher.dispatch(UnitEnraged {
                unit_id: self.id,
                occurred_at: now,
            });
        }

        if hp_after == 0 {
            if !self.death_reported {
                self.death_reported = true;
                tracing::info!(unit_id = %self.id, kind = ?self.kind, "Unit died");
                self.dispatcher.dispatch(self.kind.death_event(self.id, now));
            }
            return DamageOutcome::Killed { damage: amount };
        }

        DamageOutcome::Wounded {
            damage: amount,
            hp_after,
            enraged,
        }
    }

    /// Debug helper: back to full HP and calm, without publishing anything.
    ///
    /// The unit can report its death again afterwards.
    pub fn restore_full_hp(&mut self) {
        self.status = self.status.restored();
        self.death_reported = false;
    }
}

impl fmt::Debug for UnitEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitEntity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("enrage_threshold", &self.enrage_threshold)
            .finish()
    }
}
