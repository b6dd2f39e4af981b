//! Per-unit gameplay logic ports consumed by the AI controller.
//!
//! All methods take `&self`: the controller, the unit service and the
//! enrage wiring share one instance through `Arc`.

use std::sync::Arc;

use enemy_domain::Vec3;

/// Invoked once per accepted attack.
pub type AttackListener = Arc<dyn Fn() + Send + Sync>;

/// Velocity and navigation target provider.
#[cfg_attr(test, mockall::automock)]
pub trait MoveLogic: Send + Sync {
    fn move_to(&self, destination: Vec3);
    fn stop(&self);
    fn has_arrived(&self) -> bool;
    fn position(&self) -> Vec3;
    fn set_speed_multiplier(&self, multiplier: f32);
    fn speed_multiplier(&self) -> f32;
    /// Speed applied on the last tick, after multiplier and turn falloff.
    fn current_speed(&self) -> f32;
    fn tick(&self, dt: f32);
    fn dispose(&self);
}

/// Cooldown-gated attack trigger.
#[cfg_attr(test, mockall::automock)]
pub trait CombatLogic: Send + Sync {
    fn is_ready(&self) -> bool;
    /// Fire an attack if the cooldown has elapsed. Returns whether it fired.
    fn use_attack(&self) -> bool;
    fn tick(&self, dt: f32);
    fn set_attack_multiplier(&self, multiplier: f32);
    fn attack_multiplier(&self) -> f32;
    fn calc_damage(&self) -> i32;
    fn remaining_cooldown(&self) -> f32;
    /// Replace the attack listener. `None` detaches it.
    fn set_attack_listener(&self, listener: Option<AttackListener>);
    fn dispose(&self);
}

/// Cached perception of one unit: where it is, where its target is.
#[cfg_attr(test, mockall::automock)]
pub trait AiContext: Send + Sync {
    /// Advance the poll timer; re-query the world when it elapses.
    fn refresh(&self, dt: f32);
    fn self_position(&self) -> Vec3;
    fn target_position(&self) -> Option<Vec3>;
    /// `f32::INFINITY` when there is no target.
    fn distance_to_target(&self) -> f32;
    fn has_line_of_sight(&self) -> bool;
}
