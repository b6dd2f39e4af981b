//! Base controller with pair and enrage behaviors layered on.

use std::sync::Arc;

use enemy_domain::{AiState, ClockPort, EventDispatcher, PairEnraged, PairId, UnitId};

use super::behaviors::{EnrageBehavior, PairBehavior, UnitBehavior};
use super::{AiController, AiError, UnitAi};

const COMPONENT: &str = "PairedAiController";

/// AI for one half of a twin pair.
///
/// When the partner dies the unit enrages once: its move and combat
/// multipliers are raised and a `PairEnraged` event is published.
///
/// Initialization runs base, pair, enrage in that order. If a later part
/// fails, only the parts that already initialized are disposed, in reverse
/// order, and the controller is left disposed.
pub struct PairedAiController<B = AiController, P = PairBehavior, E = EnrageBehavior> {
    base: B,
    pair: Arc<P>,
    enrage: Arc<E>,
    stage: InitStage,
    disposed: bool,
}

/// Last part that finished initializing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum InitStage {
    Pending,
    Base,
    Pair,
    Ready,
}

impl PairedAiController {
    pub fn new(
        base: AiController,
        dispatcher: EventDispatcher,
        pair_id: PairId,
        enrage_speed_multiplier: f32,
        enrage_attack_multiplier: f32,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let pair = Arc::new(PairBehavior::new(dispatcher.clone(), pair_id));
        let enrage = Arc::new(EnrageBehavior::new(
            enrage_speed_multiplier,
            enrage_attack_multiplier,
        ));
        Self::with_behaviors(base, pair, enrage, &dispatcher, clock)
    }

    fn with_behaviors(
        base: AiController,
        pair: Arc<PairBehavior>,
        enrage: Arc<EnrageBehavior>,
        dispatcher: &EventDispatcher,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let weak_enrage = Arc::downgrade(&enrage);
        pair.on_pair_member_died(Arc::new(move |partner| {
            let Some(enrage) = weak_enrage.upgrade() else {
                return;
            };
            if let Err(e) = enrage.trigger_enrage() {
                tracing::warn!(partner = %partner, error = %e, "Pair enrage not applied");
            }
        }));

        let multipliers = base.multipliers();
        let speed = enrage.speed_multiplier();
        let attack = enrage.attack_multiplier();
        let events = dispatcher.downgrade();
        enrage.on_enrage_triggered(Arc::new(move |unit_id| {
            multipliers.set_speed_multiplier(speed);
            multipliers.set_attack_multiplier(attack);
            events.dispatch(PairEnraged {
                unit_id,
                occurred_at: clock.now(),
            });
        }));

        Self::from_parts(base, pair, enrage)
    }

    pub fn pair_id(&self) -> PairId {
        self.pair.pair_id()
    }

    pub fn is_enraged(&self) -> bool {
        self.enrage.is_enraged()
    }
}

impl<B, P, E> PairedAiController<B, P, E>
where
    B: UnitAi,
    P: UnitBehavior,
    E: UnitBehavior,
{
    fn from_parts(base: B, pair: Arc<P>, enrage: Arc<E>) -> Self {
        Self {
            base,
            pair,
            enrage,
            stage: InitStage::Pending,
            disposed: false,
        }
    }

    /// Dispose every part that finished initializing, last one first.
    fn tear_down(&mut self) {
        self.disposed = true;
        if self.stage >= InitStage::Ready {
            self.enrage.dispose();
        }
        if self.stage >= InitStage::Pair {
            self.pair.dispose();
        }
        if self.stage >= InitStage::Base {
            self.base.dispose();
        }
    }

    fn roll_back(&mut self, failed: &'static str, error: &AiError) {
        tracing::warn!(
            component = failed,
            stage = ?self.stage,
            error = %error,
            "Paired AI initialization failed; rolling back"
        );
        self.tear_down();
    }
}

impl<B, P, E> UnitAi for PairedAiController<B, P, E>
where
    B: UnitAi,
    P: UnitBehavior,
    E: UnitBehavior,
{
    fn initialize(&mut self, unit_id: UnitId) -> Result<(), AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        if self.stage == InitStage::Ready {
            return Ok(());
        }

        if let Err(e) = self.base.initialize(unit_id) {
            self.roll_back("base", &e);
            return Err(e);
        }
        self.stage = InitStage::Base;
        if let Err(e) = self.pair.initialize(unit_id) {
            self.roll_back("pair", &e);
            return Err(e);
        }
        self.stage = InitStage::Pair;
        if let Err(e) = self.enrage.initialize(unit_id) {
            self.roll_back("enrage", &e);
            return Err(e);
        }
        self.stage = InitStage::Ready;

        tracing::debug!(unit_id = %unit_id, "Paired AI initialized");
        Ok(())
    }

    fn tick(&mut self, dt: f32) -> Result<(), AiError> {
        if self.disposed {
            return Err(AiError::disposed(COMPONENT));
        }
        if self.stage != InitStage::Ready {
            return Err(AiError::not_initialized(COMPONENT));
        }
        self.base.tick(dt)?;
        self.pair.update(dt);
        self.enrage.update(dt);
        Ok(())
    }

    fn state(&self) -> AiState {
        self.base.state()
    }

    fn set_speed_multiplier(&self, multiplier: f32) {
        self.base.set_speed_multiplier(multiplier);
    }

    fn set_attack_multiplier(&self, multiplier: f32) {
        self.base.set_attack_multiplier(multiplier);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.tear_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::combat::SimpleCombatLogic;
    use crate::infrastructure::ports::{CombatLogic, MoveLogic};
    use crate::infrastructure::settings::{fixed, AiTuning};
    use crate::test_fixtures::{RecordingMovement, ScriptedContext};
    use chrono::Utc;
    use crate::use_cases::ai::behaviors::MockUnitBehavior;
    use crate::use_cases::ai::MockUnitAi;
    use enemy_domain::{EventKind, PairMateDied, Subscription, Topic, Vec3};
    use mockall::Sequence;
    use std::sync::Mutex;

    struct Rig {
        movement: Arc<RecordingMovement>,
        combat: Arc<SimpleCombatLogic>,
        dispatcher: EventDispatcher,
        pair_id: PairId,
        enraged: Arc<Mutex<Vec<PairEnraged>>>,
        _recorder: Subscription,
    }

    fn rig() -> Rig {
        let dispatcher = EventDispatcher::new();
        let enraged = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&enraged);
        let recorder =
            dispatcher.register(move |e: &PairEnraged| sink.lock().unwrap().push(e.clone()));
        Rig {
            movement: Arc::new(RecordingMovement::new(Vec3::ZERO)),
            combat: Arc::new(SimpleCombatLogic::new(fixed(10), fixed(1.0))),
            dispatcher,
            pair_id: PairId::new(),
            enraged,
            _recorder: recorder,
        }
    }

    fn base(rig: &Rig) -> AiController {
        AiController::new(
            Arc::new(ScriptedContext::new()),
            rig.movement.clone(),
            rig.combat.clone(),
            rig.dispatcher.clone(),
            AiTuning::fixed(10.0, 2.0, vec![], 0.0, 20.0),
        )
    }

    fn paired(rig: &Rig) -> PairedAiController {
        PairedAiController::new(
            base(rig),
            rig.dispatcher.clone(),
            rig.pair_id,
            2.0,
            3.0,
            FixedClock::arc(),
        )
    }

    fn mate_died(unit_id: UnitId, pair_id: PairId) -> PairMateDied {
        PairMateDied {
            unit_id,
            pair_id,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn partner_death_enrages_once_with_configured_multipliers() {
        let rig = rig();
        let mut ai = paired(&rig);
        let me = UnitId::new();
        ai.initialize(me).unwrap();

        rig.dispatcher.dispatch(mate_died(UnitId::new(), rig.pair_id));

        assert!(ai.is_enraged());
        assert_eq!(rig.movement.speed_multiplier(), 2.0);
        assert_eq!(rig.combat.attack_multiplier(), 3.0);
        {
            let enraged = rig.enraged.lock().unwrap();
            assert_eq!(enraged.len(), 1);
            assert_eq!(enraged[0].unit_id, me);
            assert_eq!(enraged[0].occurred_at, FixedClock::instant());
        }

        // A second partner death report changes nothing
        rig.dispatcher.dispatch(mate_died(UnitId::new(), rig.pair_id));
        assert_eq!(rig.enraged.lock().unwrap().len(), 1);
        assert_ne!(ai.state(), AiState::Dead);
    }

    #[test]
    fn own_death_kills_without_enraging() {
        let rig = rig();
        let mut ai = paired(&rig);
        let me = UnitId::new();
        ai.initialize(me).unwrap();

        rig.dispatcher.dispatch(mate_died(me, rig.pair_id));

        assert_eq!(ai.state(), AiState::Dead);
        assert!(!ai.is_enraged());
        assert_eq!(rig.movement.speed_multiplier(), 1.0);
    }

    #[test]
    fn other_pairs_are_ignored() {
        let rig = rig();
        let mut ai = paired(&rig);
        ai.initialize(UnitId::new()).unwrap();

        rig.dispatcher.dispatch(mate_died(UnitId::new(), PairId::new()));
        assert!(!ai.is_enraged());
        assert!(rig.enraged.lock().unwrap().is_empty());
    }

    #[test]
    fn tick_requires_initialize_and_initialize_is_idempotent() {
        let rig = rig();
        let mut ai = paired(&rig);
        assert_eq!(ai.tick(0.1), Err(AiError::not_initialized("PairedAiController")));

        let me = UnitId::new();
        ai.initialize(me).unwrap();
        ai.initialize(me).unwrap();
        // Base death handler plus the pair behavior
        assert_eq!(
            rig.dispatcher.handler_count(Topic::Kind(EventKind::PairMateDied)),
            2
        );
        ai.tick(0.1).unwrap();
        assert_eq!(ai.state(), AiState::Idle);
    }

    #[test]
    fn failing_enrage_rolls_back_pair_and_base() {
        let rig = rig();
        let pair = Arc::new(PairBehavior::new(rig.dispatcher.clone(), rig.pair_id));
        let enrage = Arc::new(EnrageBehavior::new(2.0, 2.0));
        enrage.dispose();

        let mut ai = PairedAiController::with_behaviors(
            base(&rig),
            Arc::clone(&pair),
            enrage,
            &rig.dispatcher,
            FixedClock::arc(),
        );
        assert_eq!(
            ai.initialize(UnitId::new()),
            Err(AiError::disposed("EnrageBehavior"))
        );

        assert!(!pair.is_initialized());
        assert_eq!(rig.dispatcher.handler_count(Topic::Kind(EventKind::UnitDied)), 0);
        assert_eq!(
            rig.dispatcher.handler_count(Topic::Kind(EventKind::PairMateDied)),
            0
        );
        assert_eq!(ai.tick(0.1), Err(AiError::disposed("PairedAiController")));
    }

    #[test]
    fn dispose_tears_everything_down_once() {
        let rig = rig();
        let mut ai = paired(&rig);
        ai.initialize(UnitId::new()).unwrap();

        ai.dispose();
        ai.dispose();

        assert_eq!(
            rig.dispatcher.handler_count(Topic::Kind(EventKind::PairMateDied)),
            0
        );
        rig.dispatcher.dispatch(mate_died(UnitId::new(), rig.pair_id));
        assert!(rig.enraged.lock().unwrap().is_empty());
        assert_eq!(ai.initialize(UnitId::new()), Err(AiError::disposed("PairedAiController")));
    }

    fn mock_parts() -> (MockUnitAi, MockUnitBehavior, MockUnitBehavior) {
        (MockUnitAi::new(), MockUnitBehavior::new(), MockUnitBehavior::new())
    }

    #[test]
    fn failing_pair_disposes_only_the_base() {
        let mut seq = Sequence::new();
        let (mut base, mut pair, mut enrage) = mock_parts();
        base.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        pair.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AiError::disposed("PairBehavior")));
        base.expect_dispose().times(1).in_sequence(&mut seq).return_const(());
        pair.expect_dispose().never();
        enrage.expect_initialize().never();
        enrage.expect_dispose().never();

        let mut ai = PairedAiController::from_parts(base, Arc::new(pair), Arc::new(enrage));
        assert_eq!(
            ai.initialize(UnitId::new()),
            Err(AiError::disposed("PairBehavior"))
        );
        assert_eq!(ai.tick(0.1), Err(AiError::disposed("PairedAiController")));
        ai.dispose();
    }

    #[test]
    fn failing_base_disposes_nothing() {
        let (mut base, mut pair, mut enrage) = mock_parts();
        base.expect_initialize()
            .times(1)
            .returning(|_| Err(AiError::disposed("AiController")));
        base.expect_dispose().never();
        pair.expect_initialize().never();
        pair.expect_dispose().never();
        enrage.expect_initialize().never();
        enrage.expect_dispose().never();

        let mut ai = PairedAiController::from_parts(base, Arc::new(pair), Arc::new(enrage));
        assert!(ai.initialize(UnitId::new()).is_err());
        ai.dispose();
    }

    #[test]
    fn failing_enrage_disposes_pair_then_base() {
        let mut seq = Sequence::new();
        let (mut base, mut pair, mut enrage) = mock_parts();
        base.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        pair.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        enrage
            .expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AiError::disposed("EnrageBehavior")));
        pair.expect_dispose().times(1).in_sequence(&mut seq).return_const(());
        base.expect_dispose().times(1).in_sequence(&mut seq).return_const(());
        enrage.expect_dispose().never();

        let mut ai = PairedAiController::from_parts(base, Arc::new(pair), Arc::new(enrage));
        assert!(ai.initialize(UnitId::new()).is_err());
    }

    #[test]
    fn dispose_runs_enrage_then_pair_then_base() {
        let mut seq = Sequence::new();
        let (mut base, mut pair, mut enrage) = mock_parts();
        base.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        pair.expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        enrage
            .expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        base.expect_tick().times(1).returning(|_| Ok(()));
        pair.expect_update().times(1).return_const(());
        enrage.expect_update().times(1).return_const(());
        enrage.expect_dispose().times(1).in_sequence(&mut seq).return_const(());
        pair.expect_dispose().times(1).in_sequence(&mut seq).return_const(());
        base.expect_dispose().times(1).in_sequence(&mut seq).return_const(());

        let mut ai = PairedAiController::from_parts(base, Arc::new(pair), Arc::new(enrage));
        ai.initialize(UnitId::new()).unwrap();
        ai.initialize(UnitId::new()).unwrap();
        ai.tick(0.1).unwrap();
        ai.dispose();
        ai.dispose();
    }
}
