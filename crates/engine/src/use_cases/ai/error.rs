//! Lifecycle errors for AI controllers and behaviors.

/// Wiring bugs: a component used outside its initialize/dispose window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    #[error("{component} used before initialize")]
    NotInitialized { component: &'static str },

    #[error("{component} used after dispose")]
    Disposed { component: &'static str },
}

impl AiError {
    pub fn not_initialized(component: &'static str) -> Self {
        Self::NotInitialized { component }
    }

    pub fn disposed(component: &'static str) -> Self {
        Self::Disposed { component }
    }
}
