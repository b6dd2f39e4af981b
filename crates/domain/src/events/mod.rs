//! Domain Events
//!
//! Immutable facts about what happened to a unit. Entities publish them
//! through the [`EventDispatcher`]; AI, behaviors and presentation subscribe
//! by [`EventKind`] instead of holding references to each other.

pub mod dispatcher;
pub mod unit_events;

pub use dispatcher::{EventDispatcher, Subscription, Topic, WeakEventDispatcher};
pub use unit_events::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UnitId;

/// Discriminant of a [`DomainEvent`], used as the dispatcher bucket key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    AttackPerformed,
    UnitDamaged,
    UnitEnraged,
    UnitDied,
    PairMateDied,
    PairEnraged,
}

/// Closed set of domain events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    AttackPerformed(AttackPerformed),
    UnitDamaged(UnitDamaged),
    UnitEnraged(UnitEnraged),
    UnitDied(UnitDied),
    PairMateDied(PairMateDied),
    PairEnraged(PairEnraged),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AttackPerformed(_) => EventKind::AttackPerformed,
            Self::UnitDamaged(_) => EventKind::UnitDamaged,
            Self::UnitEnraged(_) => EventKind::UnitEnraged,
            Self::UnitDied(_) => EventKind::UnitDied,
            Self::PairMateDied(_) => EventKind::PairMateDied,
            Self::PairEnraged(_) => EventKind::PairEnraged,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AttackPerformed(_) => "attack_performed",
            Self::UnitDamaged(_) => "unit_damaged",
            Self::UnitEnraged(_) => "unit_enraged",
            Self::UnitDied(_) => "unit_died",
            Self::PairMateDied(_) => "pair_mate_died",
            Self::PairEnraged(_) => "pair_enraged",
        }
    }

    /// The unit this event is about.
    pub fn unit_id(&self) -> UnitId {
        match self {
            Self::AttackPerformed(e) => e.unit_id,
            Self::UnitDamaged(e) => e.unit_id,
            Self::UnitEnraged(e) => e.unit_id,
            Self::UnitDied(e) => e.unit_id,
            Self::PairMateDied(e) => e.unit_id,
            Self::PairEnraged(e) => e.unit_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AttackPerformed(e) => e.occurred_at,
            Self::UnitDamaged(e) => e.occurred_at,
            Self::UnitEnraged(e) => e.occurred_at,
            Self::UnitDied(e) => e.occurred_at,
            Self::PairMateDied(e) => e.occurred_at,
            Self::PairEnraged(e) => e.occurred_at,
        }
    }

    /// True for every member of the death family (`UnitDied`, `PairMateDied`).
    pub fn is_death(&self) -> bool {
        matches!(self, Self::UnitDied(_) | Self::PairMateDied(_))
    }
}

/// A concrete event payload that can be registered for by type.
pub trait EventVariant: Send + Sync + 'static {
    const KIND: EventKind;

    /// Borrow the payload if `event` is this variant.
    fn from_event(event: &DomainEvent) -> Option<&Self>;
}

macro_rules! event_variant {
    ($name:ident) => {
        impl EventVariant for $name {
            const KIND: EventKind = EventKind::$name;

            fn from_event(event: &DomainEvent) -> Option<&Self> {
                match event {
                    DomainEvent::$name(e) => Some(e),
                    _ => None,
                }
            }
        }

        impl From<$name> for DomainEvent {
            fn from(value: $name) -> Self {
                DomainEvent::$name(value)
            }
        }
    };
}

event_variant!(AttackPerformed);
event_variant!(UnitDamaged);
event_variant!(UnitEnraged);
event_variant!(UnitDied);
event_variant!(PairMateDied);
event_variant!(PairEnraged);
