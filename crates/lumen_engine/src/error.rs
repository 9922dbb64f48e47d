//! Engine error type.

use thiserror::Error;

/// Errors surfaced to whoever drives the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A layout, integrator or query that this engine does not provide.
    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    #[error("Invalid render configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl EngineError {
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        EngineError::NotImplemented {
            feature: feature.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
