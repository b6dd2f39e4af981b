//! AI controller state enum

use serde::{Deserialize, Serialize};
use std::fmt;

/// States an enemy AI can be in.
///
/// # State Transitions
///
/// ```text
/// Idle -> Patrol -> Chase -> Attack -> Cooldown -> (Attack | Chase)
/// Chase -> Return -> Idle
/// any -> Dead (death event, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiState {
    /// Standing still after spawn or after returning home
    #[default]
    Idle,
    /// Walking the patrol route
    Patrol,
    /// Pursuing the tracked target
    Chase,
    /// Attack fired this tick
    Attack,
    /// Waiting for the attack to come off cooldown
    Cooldown,
    /// Target lost, heading back home
    Return,
    /// HP reached zero; movement and attacks stopped
    Dead,
}

impl AiState {
    pub const ALL: [AiState; 7] = [
        Self::Idle,
        Self::Patrol,
        Self::Chase,
        Self::Attack,
        Self::Cooldown,
        Self::Return,
        Self::Dead,
    ];

    /// Terminal states have no outgoing transitions.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Dead)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Patrol => "patrol",
            Self::Chase => "chase",
            Self::Attack => "attack",
            Self::Cooldown => "cooldown",
            Self::Return => "return",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for AiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
