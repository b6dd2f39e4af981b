//! Infrastructure implementations.
//!
//! Contains port traits and the adapters behind them.

pub mod ai_context;
pub mod clock;
pub mod combat;
pub mod message_bus;
pub mod movement;
pub mod ports;
pub mod settings;
pub mod sim;
