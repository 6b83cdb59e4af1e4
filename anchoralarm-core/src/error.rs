//! Error types for anchor operations

use thiserror::Error;

/// Errors returned by the anchor setup operations.
///
/// None of these are fatal: sensor readings that are missing are a normal
/// condition on a boat, so operations check and return an error instead of
/// panicking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// A required argument is missing, non-numeric or out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required sensor reading or prior state is missing
    #[error("{0}")]
    PreconditionFailed(String),

    /// State was changed in memory but could not be saved
    #[error("Unable to save state: {0}")]
    PersistenceFailed(String),
}

impl AnchorError {
    /// HTTP-style status code used by hosts that expose the operations over REST.
    pub fn status_code(&self) -> u16 {
        match self {
            AnchorError::InvalidInput(_) => 400,
            AnchorError::PreconditionFailed(_) => 412,
            AnchorError::PersistenceFailed(_) => 500,
        }
    }

    pub fn no_position() -> Self {
        AnchorError::PreconditionFailed("no position available".to_string())
    }

    pub fn no_heading() -> Self {
        AnchorError::PreconditionFailed("no heading available".to_string())
    }

    pub fn no_depth() -> Self {
        AnchorError::PreconditionFailed("no depth available".to_string())
    }

    pub fn not_dropped() -> Self {
        AnchorError::PreconditionFailed("anchor has not been dropped".to_string())
    }
}

/// Validate a length-like argument (radius, rode).
pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64, AnchorError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AnchorError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}
