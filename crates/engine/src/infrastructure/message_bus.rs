//! In-process FIFO message bus with a time-budgeted drain.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use enemy_domain::DomainEvent;

use super::ports::MessageBus;

/// Default per-flush budget
pub const DEFAULT_FLUSH_BUDGET: Duration = Duration::from_millis(1);

type Consumer = Box<dyn Fn(&DomainEvent) + Send + Sync>;

/// Queues published events and drains them on [`MessageBus::flush`].
///
/// Every drained event is logged as an analytics line and then handed to the
/// optional consumer. A panicking consumer is logged and skipped.
pub struct QueueMessageBus {
    queue: Mutex<VecDeque<DomainEvent>>,
    consumer: Option<Consumer>,
}

impl QueueMessageBus {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            consumer: None,
        }
    }

    pub fn with_consumer<F>(consumer: F) -> Self
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        Self {
            queue: Mutex::new(VecDeque::new()),
            consumer: Some(Box::new(consumer)),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<DomainEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueueMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for QueueMessageBus {
    fn publish(&self, event: DomainEvent) {
        self.queue().push_back(event);
    }

    fn flush(&self, budget: Duration) -> usize {
        let started = Instant::now();
        let mut drained = 0;

        while started.elapsed() < budget {
            // Lock per event so publishers are never blocked for the whole drain
            let Some(event) = self.queue().pop_front() else {
                break;
            };
            drained += 1;

            tracing::debug!(
                event_type = event.event_type(),
                unit_id = %event.unit_id(),
                occurred_at = %event.occurred_at(),
                "Domain event"
            );

            if let Some(consumer) = &self.consumer {
                if catch_unwind(AssertUnwindSafe(|| consumer(&event))).is_err() {
                    tracing::error!(event_type = event.event_type(), "Message bus consumer panicked");
                }
            }
        }

        if drained > 0 {
            tracing::trace!(drained, remaining = self.pending(), "Message bus flushed");
        }
        drained
    }

    fn pending(&self) -> usize {
        self.queue().len()
    }
}
