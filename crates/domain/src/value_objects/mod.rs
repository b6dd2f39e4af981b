//! Value objects - Immutable objects defined by their attributes

mod ai_state;
mod unit_status;
mod vector;

pub use ai_state::AiState;
pub use unit_status::UnitStatus;
pub use vector::Vec3;
