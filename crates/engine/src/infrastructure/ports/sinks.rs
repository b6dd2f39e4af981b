//! Output ports: render view and message bus.

use std::time::Duration;

use enemy_domain::DomainEvent;
use serde::Serialize;

/// Read-only snapshot pushed to the render sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitViewModel {
    pub hp_ratio: f32,
    pub is_enraged: bool,
    pub speed: f32,
}

#[cfg_attr(test, mockall::automock)]
pub trait UnitView: Send + Sync {
    fn render(&self, model: &UnitViewModel);
}

/// Out-of-core consumer of domain events (analytics, logging).
#[cfg_attr(test, mockall::automock)]
pub trait MessageBus: Send + Sync {
    fn publish(&self, event: DomainEvent);
    /// Drain queued events until empty or `budget` is spent. Returns the count drained.
    fn flush(&self, budget: Duration) -> usize;
    fn pending(&self) -> usize;
}
