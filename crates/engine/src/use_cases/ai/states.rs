//! State table for the AI controller.
//!
//! Each [`AiState`] maps to a set of plain function hooks. Per-state data
//! (timers, waypoint cursor) lives in [`Machine`] so hooks stay stateless.

use std::sync::Arc;

use enemy_domain::{AiState, UnitId, Vec3};

use crate::infrastructure::ports::{AiContext, CombatLogic, MoveLogic};
use crate::infrastructure::settings::AiTuning;

/// Seconds spent in Idle before patrolling
pub const IDLE_DURATION: f32 = 1.0;
/// Distance at which a returning unit counts as home
pub const HOME_TOLERANCE: f32 = 0.5;

/// Collaborators the hooks act on
pub(super) struct Deps {
    pub context: Arc<dyn AiContext>,
    pub movement: Arc<dyn MoveLogic>,
    pub combat: Arc<dyn CombatLogic>,
    pub tuning: AiTuning,
}

impl Deps {
    fn distance(&self) -> f32 {
        self.context.distance_to_target()
    }
}

/// Mutable state of one controller
pub(super) struct Machine {
    pub unit_id: UnitId,
    pub state: AiState,
    idle_elapsed: f32,
    next_waypoint: usize,
    patrol_wait: f32,
    /// Patrol point used when no waypoints are configured
    spawn_point: Vec3,
}

impl Machine {
    pub fn new(unit_id: UnitId, spawn_point: Vec3) -> Self {
        Self {
            unit_id,
            state: AiState::Idle,
            idle_elapsed: 0.0,
            next_waypoint: 0,
            patrol_wait: 0.0,
            spawn_point,
        }
    }

    fn waypoints(&self, deps: &Deps) -> Vec<Vec3> {
        let points = (deps.tuning.patrol_points)();
        if points.is_empty() {
            vec![self.spawn_point]
        } else {
            points
        }
    }

    fn home(&self, deps: &Deps) -> Vec3 {
        self.waypoints(deps)
            .first()
            .copied()
            .unwrap_or(self.spawn_point)
    }

    fn advance_waypoint(&mut self, deps: &Deps) {
        let points = self.waypoints(deps);
        let index = self.next_waypoint % points.len();
        deps.movement.move_to(points[index]);
        self.next_waypoint = (index + 1) % points.len();
        self.patrol_wait = 0.0;
    }
}

type EnterHook = fn(&mut Machine, &Deps);
type TickHook = fn(&mut Machine, &Deps, f32);
type ExitHook = fn(&mut Machine, &Deps);
type NextHook = fn(&Machine, &Deps) -> Option<AiState>;

pub(super) struct StateHooks {
    pub enter: EnterHook,
    pub tick: TickHook,
    pub exit: ExitHook,
    /// Transition guard, evaluated once per tick after `tick`
    pub next: NextHook,
}

pub(super) fn hooks(state: AiState) -> &'static StateHooks {
    match state {
        AiState::Idle => &IDLE,
        AiState::Patrol => &PATROL,
        AiState::Chase => &CHASE,
        AiState::Attack => &ATTACK,
        AiState::Cooldown => &COOLDOWN,
        AiState::Return => &RETURN,
        AiState::Dead => &DEAD,
    }
}

/// Exit the current state and enter `next`. Same-state switches are ignored.
pub(super) fn switch(machine: &mut Machine, deps: &Deps, next: AiState) {
    let from = machine.state;
    if from == next {
        return;
    }
    (hooks(from).exit)(machine, deps);
    machine.state = next;
    (hooks(next).enter)(machine, deps);
    tracing::debug!(unit_id = %machine.unit_id, %from, to = %next, "AI state switched");
}

fn no_enter(_: &mut Machine, _: &Deps) {}
fn no_tick(_: &mut Machine, _: &Deps, _: f32) {}
fn no_exit(_: &mut Machine, _: &Deps) {}

// Idle

// The idle timer only ever accumulates, so a unit that already idled once
// resumes patrol on the first tick after coming home.
static IDLE: StateHooks = StateHooks {
    enter: no_enter,
    tick: |m, _, dt| m.idle_elapsed += dt,
    exit: no_exit,
    next: |m, _| (m.idle_elapsed > IDLE_DURATION).then_some(AiState::Patrol),
};

// Patrol

static PATROL: StateHooks = StateHooks {
    enter: |m, deps| m.advance_waypoint(deps),
    tick: patrol_tick,
    exit: no_exit,
    next: |_, deps| (deps.distance() <= (deps.tuning.detect_range)()).then_some(AiState::Chase),
};

fn patrol_tick(m: &mut Machine, deps: &Deps, dt: f32) {
    // Target in range: the guard takes over
    if deps.distance() <= (deps.tuning.detect_range)() {
        return;
    }
    if deps.movement.has_arrived() {
        m.patrol_wait += dt;
        if m.patrol_wait >= (deps.tuning.patrol_wait)() {
            m.advance_waypoint(deps);
        }
    } else {
        m.patrol_wait = 0.0;
    }
}

// Chase

static CHASE: StateHooks = StateHooks {
    enter: chase_target,
    tick: |m, deps, _| {
        // Arrived where the target was; it has moved since
        if deps.movement.has_arrived() {
            chase_target(m, deps);
        }
    },
    exit: no_exit,
    next: chase_next,
};

fn chase_target(_: &mut Machine, deps: &Deps) {
    if let Some(target) = deps.context.target_position() {
        deps.movement.move_to(target);
    }
}

fn chase_next(_: &Machine, deps: &Deps) -> Option<AiState> {
    let distance = deps.distance();
    // Return wins over Attack when both hold
    if distance > (deps.tuning.return_home_distance)() {
        return Some(AiState::Return);
    }
    if distance < (deps.tuning.attack_range)() && deps.combat.is_ready() {
        return Some(AiState::Attack);
    }
    None
}

// Attack / Cooldown

static ATTACK: StateHooks = StateHooks {
    enter: |_, deps| {
        deps.combat.use_attack();
    },
    tick: no_tick,
    exit: no_exit,
    next: |_, _| Some(AiState::Cooldown),
};

static COOLDOWN: StateHooks = StateHooks {
    enter: no_enter,
    tick: no_tick,
    exit: no_exit,
    next: |_, deps| {
        if !deps.combat.is_ready() {
            return None;
        }
        if deps.distance() <= (deps.tuning.attack_range)() {
            Some(AiState::Attack)
        } else {
            Some(AiState::Chase)
        }
    },
};

// Return

static RETURN: StateHooks = StateHooks {
    enter: |m, deps| deps.movement.move_to(m.home(deps)),
    tick: no_tick,
    exit: no_exit,
    next: |m, deps| {
        let home = m.home(deps);
        (deps.context.self_position().distance(home) < HOME_TOLERANCE).then_some(AiState::Idle)
    },
};

// Dead

static DEAD: StateHooks = StateHooks {
    enter: |_, deps| deps.movement.stop(),
    tick: no_tick,
    exit: no_exit,
    next: |_, _| None,
};
