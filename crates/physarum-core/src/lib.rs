pub mod agent;
pub mod config;
pub mod constants;
pub mod diffusion;
pub mod engine;
pub mod field;
pub mod rng;
pub mod sensor;
pub mod steering;

pub use config::{Backend, ConfigError, DiffusionMode, Parameter, SimConfig};
pub use engine::{
    Engine, ExperimentError, FieldSnapshot, RunSummary, StepMetrics, StepTimings,
};
