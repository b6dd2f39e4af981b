//! End-to-end scenarios on the headless simulation adapters.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use enemy_domain::{
    AiState, DamageOutcome, DomainEvent, EventDispatcher, EventKind, PairId, Subscription, Vec3,
    WorldEntityId,
};

use super::{UnitFactory, UnitPresenter};
use crate::infrastructure::ai_context::{CachedAiContext, FixedTargetSelector};
use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::message_bus::QueueMessageBus;
use crate::infrastructure::ports::MockUnitView;
use crate::infrastructure::settings::{PatrolSettings, SharedSettings, UnitSettings, UnitTemplate};
use crate::infrastructure::sim::{SimNavigator, SimWorld};
use crate::test_fixtures::fixture_path;

const DT: f32 = 0.125;

struct Arena {
    world: Arc<SimWorld>,
    dummy: WorldEntityId,
    factory: Arc<UnitFactory>,
    dispatcher: EventDispatcher,
    bus: Arc<QueueMessageBus>,
    events: Arc<Mutex<Vec<DomainEvent>>>,
    _recorder: Subscription,
}

impl Arena {
    fn new(dummy_position: Vec3) -> Self {
        let world = Arc::new(SimWorld::new());
        let dummy = world.spawn(dummy_position);
        let dispatcher = EventDispatcher::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let recorder = dispatcher.register_any(move |e| sink.lock().unwrap().push(e.clone()));
        Self {
            world,
            dummy,
            factory: Arc::new(UnitFactory::new(FixedClock::arc())),
            dispatcher,
            bus: Arc::new(QueueMessageBus::new()),
            events,
            _recorder: recorder,
        }
    }

    fn spawn(&self, settings: &UnitSettings, position: Vec3, pair: Option<PairId>) -> UnitPresenter {
        let mut view = MockUnitView::new();
        view.expect_render().return_const(());

        let navigator = Arc::new(
            SimNavigator::spawn(Arc::clone(&self.world), position).with_retry(settings.navigation),
        );
        let context = Arc::new(CachedAiContext::new(
            self.world.clone(),
            navigator.clone(),
            Arc::new(FixedTargetSelector(self.dummy)),
            settings.sight_poll_interval,
        ));

        let mut presenter = UnitPresenter::new(
            Arc::new(view),
            self.bus.clone(),
            Arc::clone(&self.factory),
            Some(self.dispatcher.clone()),
            pair,
        );
        presenter
            .initialize(SharedSettings::new(settings.clone()), context, navigator)
            .unwrap();
        presenter
    }

    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(DomainEvent::kind).collect()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

fn twin_settings() -> UnitSettings {
    UnitSettings::load(fixture_path("twin_unit.json")).unwrap()
}

#[test]
fn pair_death_enrages_the_survivor_once() {
    // Dummy far outside detection range so both units stay calm
    let arena = Arena::new(Vec3::new(200.0, 0.0, 200.0));
    let settings = twin_settings();
    let pair_id = PairId::new();
    let mut a = arena.spawn(&settings, Vec3::ZERO, Some(pair_id));
    let mut b = arena.spawn(&settings, Vec3::new(3.0, 0.0, 0.0), Some(pair_id));
    let a_id = a.unit().unwrap().id();

    assert!(matches!(b.apply_damage(100).unwrap(), DamageOutcome::Killed { .. }));

    let events = arena.events.lock().unwrap().clone();
    let death = events
        .iter()
        .find_map(|e| match e {
            DomainEvent::PairMateDied(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(death.pair_id, pair_id);
    assert_eq!(Some(death.unit_id), b.unit().map(|u| u.id()));
    assert_eq!(b.unit().unwrap().ai_state(), AiState::Dead);

    let survivor = a.unit().unwrap();
    assert_eq!(survivor.speed_multiplier(), settings.twin.enrage_speed_multiplier);
    assert_eq!(survivor.attack_multiplier(), settings.twin.enrage_attack_multiplier);
    assert_eq!(arena.count(EventKind::PairEnraged), 1);
    assert!(events
        .iter()
        .any(|e| e.kind() == EventKind::PairEnraged && e.unit_id() == a_id));

    // Hitting the dead twin again reports nothing new
    b.apply_damage(10).unwrap();
    assert_eq!(arena.count(EventKind::PairMateDied), 1);
    assert_eq!(arena.count(EventKind::PairEnraged), 1);

    for _ in 0..16 {
        a.tick(DT).unwrap();
        b.tick(DT).unwrap();
    }
    assert_eq!(b.unit().unwrap().ai_state(), AiState::Dead);
    assert_ne!(a.unit().unwrap().ai_state(), AiState::Dead);
}

#[test]
fn stock_unit_enrages_then_dies_and_stays_dead() {
    let arena = Arena::new(Vec3::new(200.0, 0.0, 200.0));
    let settings = UnitSettings::default();
    let mut unit = arena.spawn(&settings, Vec3::ZERO, None);

    assert_eq!(
        unit.apply_damage(71).unwrap(),
        DamageOutcome::Wounded {
            damage: 71,
            hp_after: 29,
            enraged: true
        }
    );
    assert!(unit.unit().unwrap().status().is_enraged());

    assert_eq!(
        unit.apply_damage(29).unwrap(),
        DamageOutcome::Killed { damage: 29 }
    );
    assert_eq!(
        arena.kinds(),
        vec![
            EventKind::UnitDamaged,
            EventKind::UnitEnraged,
            EventKind::UnitDamaged,
            EventKind::UnitDied,
        ]
    );

    for _ in 0..40 {
        unit.tick(DT).unwrap();
        assert_eq!(unit.unit().unwrap().ai_state(), AiState::Dead);
    }
    assert_eq!(unit.unit().unwrap().current_speed(), 0.0);

    // Every event also went through the bus
    assert_eq!(unit.flush_messages(Duration::from_secs(1)), 4);
}

#[test]
fn unit_chases_and_attacks_a_target_in_range() {
    let arena = Arena::new(Vec3::new(0.0, 0.0, 6.0));
    let settings = UnitSettings {
        template: UnitTemplate::Basic,
        move_speed: 4.0,
        detect_range: 12.0,
        attack_range: 2.0,
        cooldown_seconds: 1.0,
        patrol: PatrolSettings {
            points: vec![Vec3::ZERO],
            ..PatrolSettings::default()
        },
        ..UnitSettings::default()
    };
    let mut unit = arena.spawn(&settings, Vec3::ZERO, None);
    let unit_id = unit.unit().unwrap().id();

    // 1s idle, then patrol spots the target and the unit closes in
    for _ in 0..40 {
        unit.tick(DT).unwrap();
    }

    assert!(arena.count(EventKind::AttackPerformed) >= 2);
    assert!(arena
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind() == EventKind::AttackPerformed)
        .all(|e| e.unit_id() == unit_id));
    assert_eq!(arena.count(EventKind::UnitDied), 0);
}
