//! Error types for postfx.

use thiserror::Error;

/// The main error type for composer operations.
#[derive(Error, Debug)]
pub enum ComposerError {
    /// The composer was disposed and can no longer render.
    #[error("composer has been disposed")]
    Disposed,

    /// An operation required a mounted composer.
    #[error("composer not mounted - call mount() first")]
    NotMounted,

    /// A configuration value was rejected.
    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// A resource required by a pass or effect failed to load.
    #[error("failed to load resource: {0}")]
    ResourceLoad(String),

    /// A pass or effect could not be constructed.
    #[error("pass construction failed: {0}")]
    PassConstruction(String),

    /// Rendering a frame failed.
    #[error("render error: {0}")]
    Render(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for composer operations.
pub type Result<T> = std::result::Result<T, ComposerError>;
