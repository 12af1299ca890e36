//! Error type shared by the solver, the sampler and the scene.
//!
//! Every failure is local to one expression: the scene stores the message as the
//! expression's `error_reason` and keeps running.
use thiserror::Error;

/// Universal error type for the plotting pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    /// Malformed expression text
    #[error("{0}")]
    Parse(String),

    /// Equation has no closed-form branch for the requested symbol
    #[error("{0}")]
    Solve(String),

    /// A compiled branch refers to names that are neither the parameter nor a variable
    #[error("Expression uses undefined variables!")]
    UndefinedVariable(Vec<String>),

    /// A branch cannot be turned into a numeric function
    #[error("{0}")]
    Compile(String),

    /// Derivative cannot be built; the main plot stays valid
    #[error("{0}")]
    DerivativeUnsupported(String),

    /// Variable name rejected by the validator
    #[error("invalid variable name '{0}'")]
    InvalidVariable(String),

    /// Background worker pool could not be started
    #[error("compute pool error: {0}")]
    Pool(String),

    /// State file could not be read or written
    #[error("state file i/o error: {0}")]
    Io(String),

    /// State file is not a valid document
    #[error("state file format error: {0}")]
    Persist(String),
}

impl From<std::io::Error> for PlotError {
    fn from(err: std::io::Error) -> Self {
        PlotError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for PlotError {
    fn from(err: toml::de::Error) -> Self {
        PlotError::Persist(err.to_string())
    }
}

impl From<toml::ser::Error> for PlotError {
    fn from(err: toml::ser::Error) -> Self {
        PlotError::Persist(err.to_string())
    }
}
