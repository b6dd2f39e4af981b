//! Enemy engine library.
//!
//! Runs hostile units on top of the `enemy-domain` model.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports and their adapters (movement, combat, perception, bus, settings, headless sim)
//! - `use_cases/` - AI state machine and behaviors, unit composition, spawning and presentation

pub mod infrastructure;
pub mod use_cases;

/// Test fixtures shared by the unit tests.
#[cfg(test)]
pub mod test_fixtures;
