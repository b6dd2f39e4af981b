//! Unit tuning settings.
//!
//! Settings are plain serde data loaded from JSON. Running controllers never
//! hold a copy: they read through [`Accessor`] closures handed out by
//! [`SharedSettings`], so values tuned at runtime are picked up on the next
//! tick without rebuilding the unit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use enemy_domain::Vec3;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or updating settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Which builder the factory uses for a unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitTemplate {
    #[default]
    Basic,
    Twin,
    /// Any tag this build does not know; spawns as [`UnitTemplate::Basic`]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatrolSettings {
    /// Waypoints visited cyclically. Empty means "patrol in place".
    pub points: Vec<Vec3>,
    pub wait_seconds: f32,
    pub return_home_distance: f32,
}

impl Default for PatrolSettings {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            wait_seconds: 0.0,
            return_home_distance: 15.0,
        }
    }
}

/// Multipliers applied when a twin loses its partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwinSettings {
    pub enrage_speed_multiplier: f32,
    pub enrage_attack_multiplier: f32,
}

impl Default for TwinSettings {
    fn default() -> Self {
        Self {
            enrage_speed_multiplier: 2.0,
            enrage_attack_multiplier: 2.0,
        }
    }
}

/// Path request retries after a navigation failure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationSettings {
    /// Retries after the first failed request; the agent gives up after that
    pub max_retries: u32,
    /// Seconds before the first retry. Doubles with every further failure.
    pub retry_base_delay: f32,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_base_delay: 0.5,
        }
    }
}

impl NavigationSettings {
    /// Backoff after the `failures`-th consecutive failure (1-based).
    pub fn retry_delay(&self, failures: u32) -> f32 {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        self.retry_base_delay * 2f32.powi(exponent)
    }
}

/// All tunable values of one unit type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitSettings {
    pub template: UnitTemplate,

    // ============================================================================
    // Health
    // ============================================================================
    pub max_hp: i32,
    /// HP ratio below which the unit enrages
    pub enrage_threshold: f32,

    // ============================================================================
    // Movement & Perception
    // ============================================================================
    pub move_speed: f32,
    pub detect_range: f32,
    /// Seconds between world queries in the AI context
    pub sight_poll_interval: f32,
    pub patrol: PatrolSettings,
    pub navigation: NavigationSettings,

    // ============================================================================
    // Combat
    // ============================================================================
    pub attack_power: i32,
    pub cooldown_seconds: f32,
    pub attack_range: f32,

    pub twin: TwinSettings,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            template: UnitTemplate::Basic,
            max_hp: 100,
            enrage_threshold: 0.3,
            move_speed: 5.0,
            detect_range: 25.0,
            sight_poll_interval: 0.05,
            patrol: PatrolSettings::default(),
            navigation: NavigationSettings::default(),
            attack_power: 10,
            cooldown_seconds: 1.2,
            attack_range: 2.5,
            twin: TwinSettings::default(),
        }
    }
}

impl UnitSettings {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), template = ?settings.template, "Loaded unit settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hp <= 0 {
            return Err(ConfigError::invalid(format!(
                "maxHp must be positive, got {}",
                self.max_hp
            )));
        }
        if !(0.0..=1.0).contains(&self.enrage_threshold) {
            return Err(ConfigError::invalid(format!(
                "enrageThreshold must be within [0, 1], got {}",
                self.enrage_threshold
            )));
        }
        if self.attack_power < 0 {
            return Err(ConfigError::invalid("attackPower must not be negative"));
        }

        let non_negative = [
            ("moveSpeed", self.move_speed),
            ("detectRange", self.detect_range),
            ("sightPollInterval", self.sight_poll_interval),
            ("cooldownSeconds", self.cooldown_seconds),
            ("attackRange", self.attack_range),
            ("patrol.waitSeconds", self.patrol.wait_seconds),
            ("patrol.returnHomeDistance", self.patrol.return_home_distance),
            ("navigation.retryBaseDelay", self.navigation.retry_base_delay),
            ("twin.enrageSpeedMultiplier", self.twin.enrage_speed_multiplier),
            ("twin.enrageAttackMultiplier", self.twin.enrage_attack_multiplier),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Live-read configuration value
pub type Accessor<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Accessor that always returns `value`.
pub fn fixed<T>(value: T) -> Accessor<T>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move || value.clone())
}

/// AI controller configuration, read on every use
#[derive(Clone)]
pub struct AiTuning {
    pub detect_range: Accessor<f32>,
    pub attack_range: Accessor<f32>,
    pub patrol_points: Accessor<Vec<Vec3>>,
    pub patrol_wait: Accessor<f32>,
    pub return_home_distance: Accessor<f32>,
}

impl AiTuning {
    /// Constant tuning, mostly for tests and scripted scenarios.
    pub fn fixed(
        detect_range: f32,
        attack_range: f32,
        patrol_points: Vec<Vec3>,
        patrol_wait: f32,
        return_home_distance: f32,
    ) -> Self {
        Self {
            detect_range: fixed(detect_range),
            attack_range: fixed(attack_range),
            patrol_points: fixed(patrol_points),
            patrol_wait: fixed(patrol_wait),
            return_home_distance: fixed(return_home_distance),
        }
    }
}

/// Settings shared between the host (which may tune them) and running units
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<UnitSettings>>,
}

impl SharedSettings {
    pub fn new(settings: UnitSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UnitSettings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> UnitSettings {
        self.read().clone()
    }

    /// Apply `change` to a copy and swap it in only if the result validates.
    pub fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut UnitSettings),
    {
        let mut next = self.snapshot();
        change(&mut next);
        next.validate()?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }

    /// Accessor projecting one value out of the live settings.
    pub fn accessor<T, F>(&self, project: F) -> Accessor<T>
    where
        T: 'static,
        F: Fn(&UnitSettings) -> T + Send + Sync + 'static,
    {
        let shared = self.clone();
        Arc::new(move || project(&shared.read()))
    }

    pub fn ai_tuning(&self) -> AiTuning {
        AiTuning {
            detect_range: self.accessor(|s| s.detect_range),
            attack_range: self.accessor(|s| s.attack_range),
            patrol_points: self.accessor(|s| s.patrol.points.clone()),
            patrol_wait: self.accessor(|s| s.patrol.wait_seconds),
            return_home_distance: self.accessor(|s| s.patrol.return_home_distance),
        }
    }
}
