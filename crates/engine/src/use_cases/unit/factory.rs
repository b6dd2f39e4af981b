//! Template-keyed unit construction.

use std::collections::HashMap;
use std::sync::Arc;

use enemy_domain::{ClockPort, DomainError, EventDispatcher, PairId, UnitEntity, UnitId, UnitKind};

use crate::infrastructure::combat::SimpleCombatLogic;
use crate::infrastructure::movement::NavigationMoveLogic;
use crate::infrastructure::ports::{AiContext, NavigationPort};
use crate::infrastructure::settings::{SharedSettings, UnitSettings, UnitTemplate};
use crate::use_cases::ai::{AiController, AiError, PairedAiController};

use super::UnitService;

/// Errors raised while spawning a unit
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("Invalid unit configuration: {0}")]
    Domain(#[from] DomainError),

    #[error("Unit AI failed to start: {0}")]
    Ai(#[from] AiError),
}

/// Everything a builder needs from the host for one unit.
pub struct SpawnRequest {
    pub settings: SharedSettings,
    /// Dispatcher shared by the unit's group (both halves of a pair)
    pub dispatcher: EventDispatcher,
    pub context: Arc<dyn AiContext>,
    pub navigator: Arc<dyn NavigationPort>,
    /// Pair link for twin templates
    pub pair: Option<PairId>,
}

pub type UnitBuilder = fn(&BuildContext, SpawnRequest) -> Result<UnitService, SpawnError>;

/// Factory-wide collaborators handed to every builder
pub struct BuildContext {
    pub clock: Arc<dyn ClockPort>,
}

/// Picks a builder by the settings' template tag.
///
/// Tags without a registered builder spawn through the basic builder.
pub struct UnitFactory {
    context: BuildContext,
    builders: HashMap<UnitTemplate, UnitBuilder>,
}

impl UnitFactory {
    /// Factory with the stock `basic` and `twin` builders registered.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        let mut factory = Self {
            context: BuildContext { clock },
            builders: HashMap::new(),
        };
        factory.register(UnitTemplate::Basic, build_basic);
        factory.register(UnitTemplate::Twin, build_twin);
        factory
    }

    /// Add or replace the builder for `template`.
    pub fn register(&mut self, template: UnitTemplate, builder: UnitBuilder) {
        self.builders.insert(template, builder);
    }

    pub fn spawn(&self, request: SpawnRequest) -> Result<UnitService, SpawnError> {
        let template = request.settings.snapshot().template;
        let builder = match self.builders.get(&template) {
            Some(builder) => *builder,
            None => {
                tracing::warn!(?template, "No builder for unit template; spawning basic unit");
                build_basic
            }
        };
        builder(&self.context, request)
    }
}

struct Parts {
    movement: Arc<NavigationMoveLogic>,
    combat: Arc<SimpleCombatLogic>,
    ai: AiController,
}

fn parts(request: &SpawnRequest) -> Parts {
    let settings = &request.settings;
    let movement = Arc::new(NavigationMoveLogic::new(
        settings.accessor(|s| s.move_speed),
        Arc::clone(&request.navigator),
    ));
    let combat = Arc::new(SimpleCombatLogic::new(
        settings.accessor(|s| s.attack_power),
        settings.accessor(|s| s.cooldown_seconds),
    ));
    let ai = AiController::new(
        Arc::clone(&request.context),
        movement.clone(),
        combat.clone(),
        request.dispatcher.clone(),
        settings.ai_tuning(),
    );
    Parts {
        movement,
        combat,
        ai,
    }
}

fn entity(
    ctx: &BuildContext,
    snapshot: &UnitSettings,
    kind: UnitKind,
    dispatcher: &EventDispatcher,
) -> Result<UnitEntity, DomainError> {
    UnitEntity::new(
        UnitId::new(),
        kind,
        snapshot.max_hp,
        snapshot.enrage_threshold,
        dispatcher.clone(),
        Arc::clone(&ctx.clock),
    )
}

/// Standard unit with the plain state machine.
pub fn build_basic(ctx: &BuildContext, request: SpawnRequest) -> Result<UnitService, SpawnError> {
    let snapshot = request.settings.snapshot();
    let entity = entity(ctx, &snapshot, UnitKind::Standard, &request.dispatcher)?;
    let Parts {
        movement,
        combat,
        ai,
    } = parts(&request);

    UnitService::new(
        entity,
        movement,
        combat,
        Box::new(ai),
        &request.dispatcher,
        Arc::clone(&ctx.clock),
    )
    .map_err(SpawnError::from)
}

/// Paired unit that enrages when its partner dies.
///
/// Without a pair link the unit gets a pair of its own and can never enrage.
pub fn build_twin(ctx: &BuildContext, request: SpawnRequest) -> Result<UnitService, SpawnError> {
    let snapshot = request.settings.snapshot();
    let pair_id = request.pair.unwrap_or_else(|| {
        let pair_id = PairId::new();
        tracing::warn!(pair_id = %pair_id, "Twin unit spawned without a pair link");
        pair_id
    });
    let entity = entity(ctx, &snapshot, UnitKind::Paired { pair_id }, &request.dispatcher)?;
    let Parts {
        movement,
        combat,
        ai,
    } = parts(&request);

    let ai = PairedAiController::new(
        ai,
        request.dispatcher.clone(),
        pair_id,
        snapshot.twin.enrage_speed_multiplier,
        snapshot.twin.enrage_attack_multiplier,
        Arc::clone(&ctx.clock),
    );

    UnitService::new(
        entity,
        movement,
        combat,
        Box::new(ai),
        &request.dispatcher,
        Arc::clone(&ctx.clock),
    )
    .map_err(SpawnError::from)
}
