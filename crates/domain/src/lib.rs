//! Core domain for hostile units: identity, health/rage lifecycle and the
//! in-process event dispatcher that decouples everything else.

pub mod aggregates;
pub mod error;
pub mod events;
pub mod ids;
pub mod ports;
pub mod value_objects;

pub use aggregates::{DamageOutcome, UnitEntity, UnitKind};
pub use error::DomainError;
pub use events::{
    AttackPerformed, DomainEvent, EventDispatcher, EventKind, EventVariant, PairEnraged,
    PairMateDied, Subscription, Topic, UnitDamaged, UnitDied, UnitEnraged, WeakEventDispatcher,
};
pub use ids::{PairId, UnitId, WorldEntityId};
pub use ports::ClockPort;
pub use value_objects::{AiState, UnitStatus, Vec3};
