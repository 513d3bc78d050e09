use thiserror::Error;

/// Errors raised while turning node parameters into validated values
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("'polygon' param must have an equal number of 'x' and 'y' points (x: {x:?}, y: {y:?})")]
    PolygonMismatch { x: Option<usize>, y: Option<usize> },

    #[error("'polygon' param has no points")]
    EmptyPolygon,

    #[error("polygon coordinate {0} does not fit in a 32-bit pixel coordinate")]
    CoordinateOutOfRange(i64),

    #[error("transform must be a 9-element list of doubles (3x3 matrix, row major), got {0} values")]
    TransformLength(usize),

    #[error("output size must be positive, got {width}x{height}")]
    InvalidOutputSize { width: i32, height: i32 },

    #[error("invalid parameters: {0}")]
    Invalid(#[from] serde_json::Error),
}
