//! Caller-visible error taxonomy
//!
//! Each variant maps to the `code` of an `ErrorResponse`. Provider failures
//! are not listed here; they never reach the caller.

use thiserror::Error;
use uuid::Uuid;

pub const CODE_PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
pub const CODE_INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const CODE_DATABASE_ERROR: &str = "DATABASE_ERROR";
pub const CODE_RATE_LIMITED: &str = "RATE_LIMITED";

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Need at least {required} geocoded stops to optimize, found {found}")]
    NotEnoughGeocodedStops { required: usize, found: usize },

    #[error("Route not found: {0}")]
    RouteNotFound(Uuid),

    #[error("Too many optimization requests for route {0}, try again later")]
    RateLimited(Uuid),

    #[error("Persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl OptimizeError {
    pub fn code(&self) -> &'static str {
        match self {
            OptimizeError::NotEnoughGeocodedStops { .. } => CODE_PRECONDITION_FAILED,
            OptimizeError::RouteNotFound(_) => CODE_NOT_FOUND,
            OptimizeError::RateLimited(_) => CODE_RATE_LIMITED,
            OptimizeError::Persistence(_) => CODE_DATABASE_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error("Stop {stop_id} not found on route {route_id}")]
    NotFound { route_id: Uuid, stop_id: Uuid },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl StopError {
    pub fn code(&self) -> &'static str {
        match self {
            StopError::NotFound { .. } => CODE_NOT_FOUND,
            StopError::InvalidInput(_) => CODE_INVALID_REQUEST,
            StopError::Persistence(_) => CODE_DATABASE_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            OptimizeError::NotEnoughGeocodedStops { required: 2, found: 1 }.code(),
            "PRECONDITION_FAILED"
        );
        assert_eq!(OptimizeError::RouteNotFound(id).code(), "NOT_FOUND");
        assert_eq!(OptimizeError::RateLimited(id).code(), "RATE_LIMITED");
        assert_eq!(OptimizeError::from(anyhow::anyhow!("down")).code(), "DATABASE_ERROR");
        assert_eq!(StopError::InvalidInput("bad".into()).code(), "INVALID_REQUEST");
        assert_eq!(
            StopError::NotFound { route_id: id, stop_id: id }.code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_precondition_message() {
        let err = OptimizeError::NotEnoughGeocodedStops { required: 2, found: 0 };
        assert_eq!(err.to_string(), "Need at least 2 geocoded stops to optimize, found 0");
    }
}
