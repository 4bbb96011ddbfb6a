//! Settings module - runtime configuration for the lifecycle core.

mod settings_model;

pub use settings_model::LifecycleSettings;
