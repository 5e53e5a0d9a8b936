use physarum_core::config::{Parameter, SimConfig};
use physarum_core::Engine;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;

/// PyO3 module exposing physarum-core to plotting and UI hosts.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    parse_config(Some(config_json)).map_err(PyValueError::new_err)?;
    Ok(true)
}

/// Install a `tracing` subscriber. `level` is an env-filter directive, `info` by default.
#[pyfunction]
#[pyo3(signature = (level = None))]
fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_config(config_json: Option<&str>) -> Result<SimConfig, String> {
    let config = match config_json {
        Some(json) => serde_json::from_str::<SimConfig>(json)
            .map_err(|e| format!("invalid config json: {e}"))?,
        None => SimConfig::default(),
    };
    config
        .validate()
        .map_err(|e| format!("invalid simulation configuration: {e}"))?;
    Ok(config)
}

#[pyclass]
pub struct Simulation {
    engine: Engine,
}

#[pymethods]
impl Simulation {
    #[new]
    #[pyo3(signature = (config_json = None, seed = None))]
    fn new(config_json: Option<&str>, seed: Option<u64>) -> PyResult<Self> {
        let config = parse_config(config_json).map_err(PyValueError::new_err)?;
        let engine = Engine::new(config, seed)
            .map_err(|e| PyValueError::new_err(format!("invalid simulation configuration: {e}")))?;
        Ok(Self { engine })
    }

    /// Advance `n` steps and return the total wall time in microseconds.
    #[pyo3(signature = (n = 1))]
    fn step(&mut self, n: usize) -> u64 {
        (0..n).map(|_| self.engine.step().total_us).sum()
    }

    fn restart(&mut self) -> PyResult<()> {
        self.engine
            .restart()
            .map_err(|e| PyValueError::new_err(format!("cannot restart: {e}")))
    }

    /// Stage a parameter by name; it takes effect on the next `restart()`.
    fn set_parameter(&mut self, name: &str, value: i64) -> PyResult<()> {
        let parameter: Parameter = name
            .parse()
            .map_err(|e| PyValueError::new_err(format!("{e}")))?;
        self.engine
            .set_parameter(parameter, value)
            .map_err(|e| PyValueError::new_err(format!("invalid value for {parameter}: {e}")))
    }

    fn agent_count(&self) -> usize {
        self.engine.agent_count()
    }

    fn step_index(&self) -> usize {
        self.engine.step_index()
    }

    fn seed(&self) -> u64 {
        self.engine.seed()
    }

    /// `(height, width)`, matching the row-major layout of `field_bytes()`.
    fn field_shape(&self) -> (usize, usize) {
        let field = self.engine.field();
        (field.height(), field.width())
    }

    fn field_bytes<'py>(&self, py: Python<'py>) -> Bound<'py, PyBytes> {
        PyBytes::new(py, self.engine.field().as_slice())
    }

    fn config_json(&self) -> PyResult<String> {
        serde_json::to_string(self.engine.config())
            .map_err(|e| PyValueError::new_err(format!("failed to serialize config: {e}")))
    }
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Simulation>()?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(setup_logging, m)?)?;
    Ok(())
}
