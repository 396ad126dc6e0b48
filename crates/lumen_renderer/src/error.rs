//! Error types for the renderer.

use thiserror::Error;

/// Invalid configuration values, detected before any work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("image resolution must be non-zero, got {width}x{height}")]
    Resolution { width: u32, height: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

/// Errors that can occur while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("a render worker panicked")]
    WorkerPanicked,
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
