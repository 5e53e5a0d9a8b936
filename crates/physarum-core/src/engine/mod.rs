pub mod metrics;
mod step;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::agent::AgentPopulation;
use crate::config::{ConfigError, Parameter, SimConfig};
use crate::diffusion::Diffuser;
use crate::field::TrailField;
use crate::rng::{create_rng, resolve_seed};
use crate::sensor::SensorGeometry;
use crate::steering::{MoveTable, TurnDraw};
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};
use tracing::debug;

/// Owns the agent population and trail field of one run and advances them step by step.
pub struct Engine {
    pub(crate) config: SimConfig,
    /// Parameter changes staged by `set_parameter`, applied on `restart`.
    pub(crate) pending_config: SimConfig,
    pub(crate) seed: u64,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) population: AgentPopulation,
    pub(crate) field: TrailField,
    pub(crate) diffuser: Diffuser,
    pub(crate) sensors: SensorGeometry,
    pub(crate) moves: MoveTable,
    /// Per-agent random draws for the current step, indexed by agent id.
    pub(crate) draws: Vec<TurnDraw>,
    pub(crate) step_index: usize,
    pub(crate) corner_resets_last_step: usize,
    pub(crate) total_corner_resets: usize,
    pub(crate) cap_warned: bool,
}

/// Why `run_experiment` refused a request before stepping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    ZeroSampleInterval,
    OverLimit {
        quantity: &'static str,
        requested: usize,
        limit: usize,
    },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSampleInterval => f.write_str("sample_every must be at least 1"),
            Self::OverLimit {
                quantity,
                requested,
                limit,
            } => write!(f, "{requested} {quantity} requested, limit is {limit}"),
        }
    }
}

impl Error for ExperimentError {}

impl Engine {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    /// Validate `config` and spawn the initial population.
    ///
    /// Without a seed one is drawn from the thread RNG; [`Engine::seed`] reports it.
    pub fn new(config: SimConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = resolve_seed(seed);
        let mut engine = Self {
            pending_config: config.clone(),
            seed,
            rng: create_rng(seed),
            population: AgentPopulation::with_capacity(config.initial_agents),
            field: TrailField::new(config.width, config.height),
            diffuser: Diffuser::from_config(&config),
            sensors: SensorGeometry::from_config(&config),
            moves: MoveTable::new(config.move_step),
            draws: Vec::with_capacity(config.initial_agents),
            step_index: 0,
            corner_resets_last_step: 0,
            total_corner_resets: 0,
            cap_warned: false,
            config,
        };
        engine.spawn_initial_population();
        debug!(
            seed,
            width = engine.config.width,
            height = engine.config.height,
            agents = engine.population.count(),
            "engine initialized"
        );
        Ok(engine)
    }

    /// Apply staged parameters, clear the field and respawn the initial population.
    ///
    /// The RNG stream continues from where the previous run left it.
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        self.pending_config.validate()?;
        let resized = self.pending_config.width != self.config.width
            || self.pending_config.height != self.config.height;
        self.config = self.pending_config.clone();

        if resized {
            self.field = TrailField::new(self.config.width, self.config.height);
        } else {
            self.field.clear();
        }
        self.diffuser = Diffuser::from_config(&self.config);
        self.sensors = SensorGeometry::from_config(&self.config);
        self.moves = MoveTable::new(self.config.move_step);

        self.population.clear();
        self.step_index = 0;
        self.corner_resets_last_step = 0;
        self.total_corner_resets = 0;
        self.cap_warned = false;
        self.spawn_initial_population();
        debug!(
            resized,
            width = self.config.width,
            height = self.config.height,
            agents = self.population.count(),
            "engine restarted"
        );
        Ok(())
    }

    /// Stage a parameter change. The value is validated now and takes effect on `restart`.
    pub fn set_parameter(&mut self, parameter: Parameter, value: i64) -> Result<(), ConfigError> {
        self.pending_config = self.pending_config.with_parameter(parameter, value)?;
        debug!(%parameter, value, "parameter staged");
        Ok(())
    }

    fn spawn_initial_population(&mut self) {
        let center = self.spawn_center();
        self.population.spawn_batch(
            self.config.initial_agents,
            center,
            self.config.initial_radius as f64,
            &mut self.rng,
        );
    }

    pub(crate) fn spawn_center(&self) -> [f64; 2] {
        [
            self.config.width as f64 / 2.0,
            self.config.height as f64 / 2.0,
        ]
    }

    /// Configuration of the running simulation.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Configuration that the next `restart` will apply.
    pub fn pending_config(&self) -> &SimConfig {
        &self.pending_config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn agent_count(&self) -> usize {
        self.population.count()
    }

    pub fn population(&self) -> &AgentPopulation {
        &self.population
    }

    pub fn field(&self) -> &TrailField {
        &self.field
    }

    pub fn field_snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::from(&self.field)
    }

    pub fn corner_resets_last_step(&self) -> usize {
        self.corner_resets_last_step
    }

    pub fn total_corner_resets(&self) -> usize {
        self.total_corner_resets
    }

    /// Advance `steps` steps, sampling metrics every `sample_every` steps and after the last one.
    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        let sample_count = planned_samples(steps, sample_every)?;

        let resets_before = self.total_corner_resets;
        let mut samples = Vec::with_capacity(sample_count);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(self.step_index));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            seed: self.seed,
            steps,
            sample_every,
            final_agent_count: self.population.count(),
            total_corner_resets: self.total_corner_resets - resets_before,
            samples,
        })
    }
}

fn under_limit(
    quantity: &'static str,
    requested: usize,
    limit: usize,
) -> Result<usize, ExperimentError> {
    if requested > limit {
        return Err(ExperimentError::OverLimit {
            quantity,
            requested,
            limit,
        });
    }
    Ok(requested)
}

/// Number of samples `run_experiment` records for `steps` steps.
pub(crate) fn planned_samples(
    steps: usize,
    sample_every: usize,
) -> Result<usize, ExperimentError> {
    if sample_every == 0 {
        return Err(ExperimentError::ZeroSampleInterval);
    }
    let steps = under_limit("steps", steps, Engine::MAX_EXPERIMENT_STEPS)?;
    under_limit(
        "samples",
        steps.div_ceil(sample_every),
        Engine::MAX_EXPERIMENT_SAMPLES,
    )
}
