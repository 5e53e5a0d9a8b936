use crate::constants::{MAX_FIELD_DIMENSION, MAX_SENSOR_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionMode {
    /// Blurred values are blended into the deposited field; weak blur fades cells.
    #[default]
    AdditiveBlend,
    /// Interior cells are replaced by their blurred value; the border keeps its value.
    Replace,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Sequential,
    /// Data-parallel agent pass and field kernels on the rayon thread pool.
    Parallel,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    /// Trail field width in pixels.
    #[serde(alias = "simulation_resolution_x")]
    pub width: usize,
    /// Trail field height in pixels.
    #[serde(alias = "simulation_resolution_y")]
    pub height: usize,
    /// Radius of the disc, centered in the field, that new agents spawn inside.
    #[serde(alias = "initial_circle_radius")]
    pub initial_radius: u32,
    /// Number of agents spawned when the simulation starts or restarts.
    #[serde(alias = "initial_cells_amount")]
    pub initial_agents: usize,
    /// Number of agents appended at the start of every step.
    #[serde(alias = "cells_spawn_rate")]
    pub spawn_rate: usize,
    /// Side of the square box-blur kernel ("decay factor").
    #[serde(alias = "trail_decay_factor")]
    pub diffusion_kernel_size: usize,
    /// Intensity removed from every cell per step ("evaporation factor").
    #[serde(alias = "trail_evaporation_factor")]
    pub evaporation_amount: u32,
    /// Distance from the agent to each sensor sample point.
    #[serde(alias = "sensors_distance")]
    pub sensor_distance: u32,
    /// Side of the square patch summed by each sensor.
    #[serde(alias = "sensors_size")]
    pub sensor_size: u32,
    /// Angle between the center sensor and each side sensor, in degrees.
    #[serde(alias = "sensors_angle_span")]
    pub sensor_angle_span: u32,
    /// Pixels moved per step along each quantized axis.
    #[serde(alias = "movement_distance")]
    pub move_step: u32,
    /// Maximum heading change per step, in degrees.
    #[serde(alias = "movement_rotation")]
    pub turn_step: u32,
    /// Selects the diffusion strategy.
    pub diffusion_mode: DiffusionMode,
    /// Selects sequential or data-parallel execution of the step kernels.
    pub backend: Backend,
    /// `AdditiveBlend`: blurred values at or below this fade the cell instead of adding.
    pub blend_threshold: u8,
    /// `AdditiveBlend`: intensity subtracted from a fading cell.
    pub blend_fade: u8,
    /// Population ceiling; spawning stops once reached (0 = unbounded).
    pub max_agents: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            initial_radius: 5,
            initial_agents: 1000,
            spawn_rate: 10,
            diffusion_kernel_size: 3,
            evaporation_amount: 5,
            sensor_distance: 9,
            sensor_size: 1,
            sensor_angle_span: 45,
            move_step: 1,
            turn_step: 40,
            diffusion_mode: DiffusionMode::AdditiveBlend,
            backend: Backend::Sequential,
            blend_threshold: 50,
            blend_fade: 10,
            max_agents: 0,
        }
    }
}

macro_rules! define_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for ConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_config_error! {
    InvalidFieldDimensions => "width and height must be greater than 0";
    FieldTooLarge { max: usize, width: usize, height: usize } => "field {}x{} exceeds supported maximum dimension ({})", width, height, max;
    InvalidInitialRadius => "initial_radius must be greater than 0";
    InvalidInitialAgents => "initial_agents must be greater than 0";
    InvalidMaxAgents { max_agents: usize, initial_agents: usize } => "max_agents ({}) must be 0 or at least initial_agents ({})", max_agents, initial_agents;
    InvalidDiffusionKernelSize => "diffusion_kernel_size must be greater than 0";
    KernelLargerThanField { kernel: usize, min_dimension: usize } => "diffusion_kernel_size ({}) exceeds the smaller field dimension ({})", kernel, min_dimension;
    InvalidEvaporationAmount => "evaporation_amount must be within [0,255]";
    InvalidSensorDistance => "sensor_distance must be greater than 0";
    InvalidSensorSize { max: u32 } => "sensor_size must be within [1,{}]", max;
    InvalidSensorAngleSpan => "sensor_angle_span must be within (0,180] degrees";
    InvalidMoveStep => "move_step must be greater than 0";
    MoveStepTooLarge { move_step: u32, min_dimension: usize } => "move_step ({}) must be smaller than the smaller field dimension ({})", move_step, min_dimension;
    InvalidTurnStep => "turn_step must be within (0,360] degrees";
    FieldTooSmallForSensors { required: usize, actual: usize } => "smaller field dimension ({}) must exceed 2 * (sensor_distance + sensor_size) = {}", actual, required;
    ParameterOutOfRange { parameter: &'static str, value: i64 } => "value {} is out of range for parameter {}", value, parameter;
}

impl std::error::Error for ConfigError {}

impl SimConfig {
    pub const MAX_FIELD_DIMENSION: usize = MAX_FIELD_DIMENSION;

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_field()?;
        self.validate_population()?;
        self.validate_trail()?;
        self.validate_sensors()?;
        self.validate_motion()?;
        Ok(())
    }

    fn validate_field(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidFieldDimensions);
        }
        if self.width > Self::MAX_FIELD_DIMENSION || self.height > Self::MAX_FIELD_DIMENSION {
            return Err(ConfigError::FieldTooLarge {
                max: Self::MAX_FIELD_DIMENSION,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn validate_population(&self) -> Result<(), ConfigError> {
        if self.initial_radius == 0 {
            return Err(ConfigError::InvalidInitialRadius);
        }
        if self.initial_agents == 0 {
            return Err(ConfigError::InvalidInitialAgents);
        }
        if self.max_agents != 0 && self.max_agents < self.initial_agents {
            return Err(ConfigError::InvalidMaxAgents {
                max_agents: self.max_agents,
                initial_agents: self.initial_agents,
            });
        }
        Ok(())
    }

    fn validate_trail(&self) -> Result<(), ConfigError> {
        if self.diffusion_kernel_size == 0 {
            return Err(ConfigError::InvalidDiffusionKernelSize);
        }
        let min_dimension = self.width.min(self.height);
        if self.diffusion_kernel_size > min_dimension {
            return Err(ConfigError::KernelLargerThanField {
                kernel: self.diffusion_kernel_size,
                min_dimension,
            });
        }
        if self.evaporation_amount > u8::MAX as u32 {
            return Err(ConfigError::InvalidEvaporationAmount);
        }
        Ok(())
    }

    fn validate_sensors(&self) -> Result<(), ConfigError> {
        if self.sensor_distance == 0 {
            return Err(ConfigError::InvalidSensorDistance);
        }
        if self.sensor_size == 0 || self.sensor_size > MAX_SENSOR_SIZE {
            return Err(ConfigError::InvalidSensorSize {
                max: MAX_SENSOR_SIZE,
            });
        }
        if self.sensor_angle_span == 0 || self.sensor_angle_span > 180 {
            return Err(ConfigError::InvalidSensorAngleSpan);
        }
        let required = 2 * (self.sensor_distance as usize + self.sensor_size as usize);
        let actual = self.width.min(self.height);
        if actual <= required {
            return Err(ConfigError::FieldTooSmallForSensors { required, actual });
        }
        Ok(())
    }

    fn validate_motion(&self) -> Result<(), ConfigError> {
        if self.move_step == 0 {
            return Err(ConfigError::InvalidMoveStep);
        }
        let min_dimension = self.width.min(self.height);
        if self.move_step as usize >= min_dimension {
            return Err(ConfigError::MoveStepTooLarge {
                move_step: self.move_step,
                min_dimension,
            });
        }
        if self.turn_step == 0 || self.turn_step > 360 {
            return Err(ConfigError::InvalidTurnStep);
        }
        Ok(())
    }

    /// Return a copy with `parameter` set to `value`, validated as a whole.
    pub fn with_parameter(&self, parameter: Parameter, value: i64) -> Result<Self, ConfigError> {
        let out_of_range = || ConfigError::ParameterOutOfRange {
            parameter: parameter.name(),
            value,
        };
        let as_usize = || usize::try_from(value).map_err(|_| out_of_range());
        let as_u32 = || u32::try_from(value).map_err(|_| out_of_range());

        let mut next = self.clone();
        match parameter {
            Parameter::Width => next.width = as_usize()?,
            Parameter::Height => next.height = as_usize()?,
            Parameter::InitialRadius => next.initial_radius = as_u32()?,
            Parameter::InitialAgents => next.initial_agents = as_usize()?,
            Parameter::SpawnRate => next.spawn_rate = as_usize()?,
            Parameter::DiffusionKernelSize => next.diffusion_kernel_size = as_usize()?,
            Parameter::EvaporationAmount => next.evaporation_amount = as_u32()?,
            Parameter::SensorDistance => next.sensor_distance = as_u32()?,
            Parameter::SensorSize => next.sensor_size = as_u32()?,
            Parameter::SensorAngleSpan => next.sensor_angle_span = as_u32()?,
            Parameter::MoveStep => next.move_step = as_u32()?,
            Parameter::TurnStep => next.turn_step = as_u32()?,
        }
        next.validate()?;
        Ok(next)
    }

    /// Current value of `parameter`.
    pub fn parameter(&self, parameter: Parameter) -> i64 {
        match parameter {
            Parameter::Width => self.width as i64,
            Parameter::Height => self.height as i64,
            Parameter::InitialRadius => self.initial_radius as i64,
            Parameter::InitialAgents => self.initial_agents as i64,
            Parameter::SpawnRate => self.spawn_rate as i64,
            Parameter::DiffusionKernelSize => self.diffusion_kernel_size as i64,
            Parameter::EvaporationAmount => self.evaporation_amount as i64,
            Parameter::SensorDistance => self.sensor_distance as i64,
            Parameter::SensorSize => self.sensor_size as i64,
            Parameter::SensorAngleSpan => self.sensor_angle_span as i64,
            Parameter::MoveStep => self.move_step as i64,
            Parameter::TurnStep => self.turn_step as i64,
        }
    }
}

/// Tunable numeric fields of [`SimConfig`], addressable by name from UI hosts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Width,
    Height,
    InitialRadius,
    InitialAgents,
    SpawnRate,
    DiffusionKernelSize,
    EvaporationAmount,
    SensorDistance,
    SensorSize,
    SensorAngleSpan,
    MoveStep,
    TurnStep,
}

impl Parameter {
    pub const ALL: [Parameter; 12] = [
        Parameter::Width,
        Parameter::Height,
        Parameter::InitialRadius,
        Parameter::InitialAgents,
        Parameter::SpawnRate,
        Parameter::DiffusionKernelSize,
        Parameter::EvaporationAmount,
        Parameter::SensorDistance,
        Parameter::SensorSize,
        Parameter::SensorAngleSpan,
        Parameter::MoveStep,
        Parameter::TurnStep,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Width => "width",
            Parameter::Height => "height",
            Parameter::InitialRadius => "initial_radius",
            Parameter::InitialAgents => "initial_agents",
            Parameter::SpawnRate => "spawn_rate",
            Parameter::DiffusionKernelSize => "diffusion_kernel_size",
            Parameter::EvaporationAmount => "evaporation_amount",
            Parameter::SensorDistance => "sensor_distance",
            Parameter::SensorSize => "sensor_size",
            Parameter::SensorAngleSpan => "sensor_angle_span",
            Parameter::MoveStep => "move_step",
            Parameter::TurnStep => "turn_step",
        }
    }

    /// Key used for this parameter by older slider and JSON configuration files.
    pub fn legacy_name(self) -> &'static str {
        match self {
            Parameter::Width => "simulation_resolution_x",
            Parameter::Height => "simulation_resolution_y",
            Parameter::InitialRadius => "initial_circle_radius",
            Parameter::InitialAgents => "initial_cells_amount",
            Parameter::SpawnRate => "cells_spawn_rate",
            Parameter::DiffusionKernelSize => "trail_decay_factor",
            Parameter::EvaporationAmount => "trail_evaporation_factor",
            Parameter::SensorDistance => "sensors_distance",
            Parameter::SensorSize => "sensors_size",
            Parameter::SensorAngleSpan => "sensors_angle_span",
            Parameter::MoveStep => "movement_distance",
            Parameter::TurnStep => "movement_rotation",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownParameter(pub String);

impl fmt::Display for UnknownParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown simulation parameter: {}", self.0)
    }
}

impl std::error::Error for UnknownParameter {}

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.name() == s || p.legacy_name() == s)
            .ok_or_else(|| UnknownParameter(s.to_string()))
    }
}
