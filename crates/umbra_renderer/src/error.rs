//! Errors surfaced to callers of the renderer.
//!
//! Only construction-time and persistence problems are reported here. The
//! intersection hot path never returns errors: degenerate geometry produces
//! NaN/Inf distances which every comparison rejects.

use thiserror::Error;

/// Errors that can occur while setting up or persisting a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid camera: {0}")]
    InvalidCamera(String),

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Scene contains no objects")]
    EmptyScene,

    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    #[error("Cannot {transform} a {surface}")]
    UnsupportedTransform {
        surface: &'static str,
        transform: &'static str,
    },

    #[error("Accumulator is {found_width}x{found_height}, render is {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("Corrupt accumulator data: {0}")]
    CorruptAccumulator(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
