//! Unit use cases: composition of one unit, template-driven spawning and
//! the presenter that binds a unit to its view.

mod factory;
mod presenter;
mod service;

#[cfg(test)]
mod scenario_tests;

pub use factory::{
    build_basic, build_twin, BuildContext, SpawnError, SpawnRequest, UnitBuilder, UnitFactory,
};
pub use presenter::UnitPresenter;
pub use service::UnitService;
