//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions the AI core talks to. Ports exist for:
//! - Spatial queries and navigation (host engine or the headless sim)
//! - Per-unit gameplay logic (movement, combat, perception)
//! - Output sinks (render view, message bus)
//!
//! The clock port lives in `enemy_domain` because the entity stamps events.

mod logic;
mod sinks;
mod spatial;

pub use enemy_domain::ClockPort;

pub use logic::{AiContext, AttackListener, CombatLogic, MoveLogic};
pub use sinks::{MessageBus, UnitView, UnitViewModel};
pub use spatial::{NavigationPort, TargetSelector, WorldPort};

#[cfg(test)]
pub use logic::{MockAiContext, MockCombatLogic, MockMoveLogic};
#[cfg(test)]
pub use sinks::{MockMessageBus, MockUnitView};
#[cfg(test)]
pub use spatial::{MockNavigationPort, MockTargetSelector, MockWorldPort};
