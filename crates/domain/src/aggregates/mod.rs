//! Aggregate roots - domain objects that own their related data
//!
//! Each aggregate:
//! - Has a unique identity
//! - Exposes behavior through methods, not public fields
//! - Publishes domain events on the shared dispatcher and returns an outcome
//!   enum from every mutation

pub mod unit;

pub use unit::{DamageOutcome, UnitEntity, UnitKind};
