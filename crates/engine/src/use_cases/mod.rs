//! Use cases - unit behavior orchestration.
//!
//! `ai` holds the per-unit decision making; `unit` composes a unit from its
//! parts and binds it to the host.

pub mod ai;
pub mod unit;

pub use ai::{AiController, AiError, PairedAiController, UnitAi};
pub use unit::{SpawnError, UnitFactory, UnitPresenter, UnitService};
