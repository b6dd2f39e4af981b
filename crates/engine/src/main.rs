//! Enemy simulation - headless driver for a twin pair.
//!
//! Spawns two paired units and a target dummy on the in-memory world, ticks
//! them at a fixed step and rolls random damage against one twin until it
//! dies, so the survivor's enrage shows up in the log.

use std::sync::Arc;

use anyhow::Context;
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enemy_domain::{ClockPort, EventDispatcher, PairId, Vec3};
use enemy_engine::infrastructure::ai_context::{CachedAiContext, FixedTargetSelector};
use enemy_engine::infrastructure::clock::SystemClock;
use enemy_engine::infrastructure::message_bus::{QueueMessageBus, DEFAULT_FLUSH_BUDGET};
use enemy_engine::infrastructure::ports::{UnitView, UnitViewModel};
use enemy_engine::infrastructure::settings::{SharedSettings, UnitSettings, UnitTemplate};
use enemy_engine::infrastructure::sim::{SimNavigator, SimWorld};
use enemy_engine::use_cases::unit::{UnitFactory, UnitPresenter};

const DEFAULT_TICKS: u32 = 400;
const DEFAULT_DT: f32 = 0.05;
/// Ticks between damage rolls against the second twin
const DAMAGE_INTERVAL: u32 = 25;

/// Render sink that writes view changes to the log
struct LogView {
    label: &'static str,
}

impl UnitView for LogView {
    fn render(&self, model: &UnitViewModel) {
        tracing::info!(
            unit = self.label,
            hp_ratio = model.hp_ratio,
            enraged = model.is_enraged,
            speed = model.speed,
            "View updated"
        );
    }
}

fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enemy_engine=debug,enemy_domain=info,enemy_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting enemy simulation");

    // Load configuration
    let settings = match std::env::var("UNIT_SETTINGS_PATH") {
        Ok(path) => UnitSettings::load(&path)
            .with_context(|| format!("loading unit settings from {path}"))?,
        Err(_) => UnitSettings {
            template: UnitTemplate::Twin,
            ..UnitSettings::default()
        },
    };
    let ticks: u32 = std::env::var("SIM_TICKS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TICKS);
    let dt: f32 = std::env::var("SIM_DT")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|dt: &f32| *dt > 0.0)
        .unwrap_or(DEFAULT_DT);
    tracing::info!(template = ?settings.template, ticks, dt, "Simulation configured");

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let factory = Arc::new(UnitFactory::new(clock));
    let world = Arc::new(SimWorld::new());
    let dummy = world.spawn(Vec3::new(0.0, 0.0, 10.0));

    // One dispatcher for the pair; owned here, not by either presenter
    let dispatcher = EventDispatcher::new();
    let pair_id = PairId::new();
    let shared = SharedSettings::new(settings);

    let spawn = |label: &'static str, position: Vec3| -> anyhow::Result<UnitPresenter> {
        let navigator = Arc::new(
            SimNavigator::spawn(Arc::clone(&world), position)
                .with_retry(shared.snapshot().navigation),
        );
        let context = Arc::new(CachedAiContext::new(
            world.clone(),
            navigator.clone(),
            Arc::new(FixedTargetSelector(dummy)),
            shared.snapshot().sight_poll_interval,
        ));
        let mut presenter = UnitPresenter::new(
            Arc::new(LogView { label }),
            Arc::new(QueueMessageBus::new()),
            Arc::clone(&factory),
            Some(dispatcher.clone()),
            Some(pair_id),
        );
        presenter
            .initialize(shared.clone(), context, navigator)
            .with_context(|| format!("spawning {label}"))?;
        Ok(presenter)
    };

    let mut left = spawn("left", Vec3::new(-3.0, 0.0, 0.0))?;
    let mut right = spawn("right", Vec3::new(3.0, 0.0, 0.0))?;

    let mut rng = rand::thread_rng();
    let mut forwarded = 0;
    for tick in 1..=ticks {
        left.tick(dt)?;
        right.tick(dt)?;

        let right_alive = right.unit().is_some_and(|u| !u.status().is_dead());
        if tick % DAMAGE_INTERVAL == 0 && right_alive {
            let amount = rng.gen_range(8..=24);
            let outcome = right.apply_damage(amount)?;
            tracing::info!(tick, amount, ?outcome, "Damage roll against right twin");
        }

        forwarded += left.flush_messages(DEFAULT_FLUSH_BUDGET);
        // Same events as the left bus; drained to keep the queue bounded
        right.flush_messages(DEFAULT_FLUSH_BUDGET);
    }

    for (label, presenter) in [("left", &left), ("right", &right)] {
        if let Some(unit) = presenter.unit() {
            tracing::info!(
                unit = label,
                state = %unit.ai_state(),
                hp = unit.status().current_hp(),
                speed_multiplier = unit.speed_multiplier(),
                attack_multiplier = unit.attack_multiplier(),
                "Final unit state"
            );
        }
    }
    tracing::info!(events = forwarded, "Simulation finished");

    left.dispose();
    right.dispose();
    dispatcher.dispose();
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
