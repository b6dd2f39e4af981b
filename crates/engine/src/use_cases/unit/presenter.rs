//! Binds one unit to its render view and the message bus.

use std::sync::Arc;
use std::time::Duration;

use enemy_domain::{DamageOutcome, EventDispatcher, PairId, Subscription};

use crate::infrastructure::ports::{AiContext, MessageBus, NavigationPort, UnitView, UnitViewModel};
use crate::infrastructure::settings::SharedSettings;
use crate::use_cases::ai::AiError;

use super::{SpawnError, SpawnRequest, UnitFactory, UnitService};

const COMPONENT: &str = "UnitPresenter";

/// Application-layer owner of one unit.
///
/// Every event on the unit's dispatcher is forwarded to the bus. The view
/// only receives a model when it differs from the last one pushed.
pub struct UnitPresenter {
    view: Arc<dyn UnitView>,
    bus: Arc<dyn MessageBus>,
    factory: Arc<UnitFactory>,
    dispatcher: EventDispatcher,
    /// Dispatcher was created here rather than injected
    owns_dispatcher: bool,
    pair: Option<PairId>,
    unit: Option<UnitService>,
    bus_subscription: Option<Subscription>,
    last_model: Option<UnitViewModel>,
    disposed: bool,
}

impl UnitPresenter {
    /// `dispatcher` is shared with other presenters of the same group; pass
    /// `None` to give this unit a private one.
    pub fn new(
        view: Arc<dyn UnitView>,
        bus: Arc<dyn MessageBus>,
        factory: Arc<UnitFactory>,
        dispatcher: Option<EventDispatcher>,
        pair: Option<PairId>,
    ) -> Self {
        let owns_dispatcher = dispatcher.is_none();
        Self {
            view,
            bus,
            factory,
            dispatcher: dispatcher.unwrap_or_default(),
            owns_dispatcher,
            pair,
            unit: None,
            bus_subscription: None,
            last_model: None,
            disposed: false,
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn unit(&self) -> Option<&UnitService> {
        self.unit.as_ref()
    }

    /// Spawn the unit and push its first view model. Idempotent.
    pub fn initialize(
        &mut self,
        settings: SharedSettings,
        context: Arc<dyn AiContext>,
        navigator: Arc<dyn NavigationPort>,
    ) -> Result<(), SpawnError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT).into());
        }
        if self.unit.is_some() {
            return Ok(());
        }

        let bus = Arc::clone(&self.bus);
        self.bus_subscription = Some(
            self.dispatcher
                .register_any(move |event| bus.publish(event.clone())),
        );

        let request = SpawnRequest {
            settings,
            dispatcher: self.dispatcher.clone(),
            context,
            navigator,
            pair: self.pair,
        };
        match self.factory.spawn(request) {
            Ok(unit) => {
                self.unit = Some(unit);
                self.render();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Unit spawn failed");
                self.bus_subscription = None;
                Err(e)
            }
        }
    }

    pub fn tick(&mut self, dt: f32) -> Result<(), AiError> {
        self.unit_mut()?.tick(dt)?;
        self.render();
        Ok(())
    }

    pub fn apply_damage(&mut self, amount: i32) -> Result<DamageOutcome, AiError> {
        let outcome = self.unit_mut()?.apply_damage(amount);
        self.render();
        Ok(outcome)
    }

    /// Drain the bus within `budget`.
    pub fn flush_messages(&self, budget: Duration) -> usize {
        self.bus.flush(budget)
    }

    /// Idempotent. The dispatcher is only disposed if this presenter created it.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.bus_subscription = None;
        if let Some(mut unit) = self.unit.take() {
            unit.dispose();
        }
        if self.owns_dispatcher {
            self.dispatcher.dispose();
        }
    }

    fn unit_mut(&mut self) -> Result<&mut UnitService, AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        self.unit
            .as_mut()
            .ok_or_else(|| AiError::not_initialized(COMPONENT))
    }

    fn render(&mut self) {
        let Some(unit) = &self.unit else {
            return;
        };
        let status = unit.status();
        let model = UnitViewModel {
            hp_ratio: status.hp_ratio(),
            is_enraged: status.is_enraged(),
            speed: unit.current_speed(),
        };
        if self.last_model == Some(model) {
            return;
        }
        self.view.render(&model);
        self.last_model = Some(model);
    }
}

impl Drop for UnitPresenter {
    fn drop(&mut self) {
        self.dispose();
    }
}
