//! Unit health/rage snapshot

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Current HP and rage phase of a unit.
///
/// Immutable: the owning entity replaces the whole value on every change.
///
/// # Invariants
///
/// - `max_hp > 0`
/// - `0 <= current_hp <= max_hp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatus {
    current_hp: i32,
    max_hp: i32,
    is_enraged: bool,
}

impl UnitStatus {
    /// Full-health, calm status.
    pub fn full(max_hp: i32) -> Result<Self, DomainError> {
        if max_hp <= 0 {
            return Err(DomainError::validation(format!(
                "max_hp must be positive, got {}",
                max_hp
            )));
        }
        Ok(Self {
            current_hp: max_hp,
            max_hp,
            is_enraged: false,
        })
    }

    #[inline]
    pub fn current_hp(&self) -> i32 {
        self.current_hp
    }

    #[inline]
    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    #[inline]
    pub fn is_enraged(&self) -> bool {
        self.is_enraged
    }

    /// `current_hp / max_hp` in `[0, 1]`.
    #[inline]
    pub fn hp_ratio(&self) -> f32 {
        self.current_hp as f32 / self.max_hp as f32
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.current_hp == 0
    }

    /// Copy with hp reduced by `amount`, clamped at zero.
    pub(crate) fn with_damage(self, amount: i32) -> Self {
        Self {
            current_hp: self.current_hp.saturating_sub(amount).max(0),
            ..self
        }
    }

    pub(crate) fn enraged(self) -> Self {
        Self {
            is_enraged: true,
            ..self
        }
    }

    pub(crate) fn restored(self) -> Self {
        Self {
            current_hp: self.max_hp,
            max_hp: self.max_hp,
            is_enraged: false,
        }
    }
}
