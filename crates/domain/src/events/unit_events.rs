//! Unit-related domain events
//!
//! Each struct is one immutable fact about a single unit. They are wrapped in
//! [`DomainEvent`](super::DomainEvent) for dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PairId, UnitId};

/// The unit fired an attack (combat logic accepted a `use`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPerformed {
    pub unit_id: UnitId,
    pub occurred_at: DateTime<Utc>,
}

/// The unit took damage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDamaged {
    pub unit_id: UnitId,
    pub damage: i32,
    pub hp_after: i32,
    pub occurred_at: DateTime<Utc>,
}

/// The unit crossed its enrage HP threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEnraged {
    pub unit_id: UnitId,
    pub occurred_at: DateTime<Utc>,
}

/// A standard unit reached zero HP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDied {
    pub unit_id: UnitId,
    pub occurred_at: DateTime<Utc>,
}

/// A paired unit reached zero HP.
///
/// Reported instead of [`UnitDied`] so the surviving partner sharing
/// `pair_id` can react.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairMateDied {
    pub unit_id: UnitId,
    pub pair_id: PairId,
    pub occurred_at: DateTime<Utc>,
}

/// A paired unit entered rage after losing its partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairEnraged {
    pub unit_id: UnitId,
    pub occurred_at: DateTime<Utc>,
}
