//! Reacts to the death of the partner sharing a pair id.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use enemy_domain::{EventDispatcher, PairId, PairMateDied, Subscription, UnitId};

use super::{Lifecycle, UnitBehavior};
use crate::use_cases::ai::AiError;

const COMPONENT: &str = "PairBehavior";

/// Receives the id of the partner that died
pub type PairListener = Arc<dyn Fn(UnitId) + Send + Sync>;

#[derive(Default)]
struct PairState {
    lifecycle: Lifecycle,
    subscription: Option<Subscription>,
}

struct PairShared {
    pair_id: PairId,
    state: Mutex<PairState>,
    listeners: Mutex<Vec<PairListener>>,
}

impl PairShared {
    fn state(&self) -> MutexGuard<'_, PairState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_pair_mate_died(&self, event: &PairMateDied) {
        let Some(own_id) = self.state().lifecycle.active_unit() else {
            return;
        };
        if event.pair_id != self.pair_id || event.unit_id == own_id {
            return;
        }

        tracing::debug!(unit_id = %own_id, partner = %event.unit_id, pair_id = %self.pair_id, "Pair member died");
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(event.unit_id);
        }
    }
}

/// Watches `PairMateDied` for its pair and raises "pair member died".
pub struct PairBehavior {
    dispatcher: EventDispatcher,
    shared: Arc<PairShared>,
}

impl PairBehavior {
    pub fn new(dispatcher: EventDispatcher, pair_id: PairId) -> Self {
        Self {
            dispatcher,
            shared: Arc::new(PairShared {
                pair_id,
                state: Mutex::new(PairState::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn pair_id(&self) -> PairId {
        self.shared.pair_id
    }

    pub fn on_pair_member_died(&self, listener: PairListener) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

impl UnitBehavior for PairBehavior {
    fn is_initialized(&self) -> bool {
        self.shared.state().lifecycle.active_unit().is_some()
    }

    fn initialize(&self, unit_id: UnitId) -> Result<(), AiError> {
        let mut state = self.shared.state();
        if !state.lifecycle.bind(unit_id, COMPONENT)? {
            return Ok(());
        }

        let weak: Weak<PairShared> = Arc::downgrade(&self.shared);
        state.subscription = Some(self.dispatcher.register(move |e: &PairMateDied| {
            if let Some(shared) = weak.upgrade() {
                shared.on_pair_mate_died(e);
            }
        }));
        Ok(())
    }

    fn update(&self, _dt: f32) {}

    fn dispose(&self) {
        let subscription = {
            let mut state = self.shared.state();
            state.lifecycle.disposed = true;
            state.subscription.take()
        };
        // Unregister outside the state lock
        drop(subscription);
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
