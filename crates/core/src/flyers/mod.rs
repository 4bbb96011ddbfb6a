//! Flyers module - lifecycle state machine, models, services, and traits.

mod archive_sweep;
mod flyers_model;
mod flyers_service;
mod flyers_traits;


pub use archive_sweep::{run_archive_sweep, spawn_archive_sweep};
pub use flyers_model::{
    Flyer, FlyerFilters, FlyerOrderField, FlyerStatus, FlyerTransition, NewFlyer,
};
pub use flyers_service::FlyerLifecycleService;
pub use flyers_traits::{FlyerLifecycleServiceTrait, FlyerRepositoryTrait};
