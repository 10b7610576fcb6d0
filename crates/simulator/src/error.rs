use powsim_simulation::SimulationError;
use thiserror::Error;

/// Errors from configuring or running the simulator.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("histogram setup failed: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}
