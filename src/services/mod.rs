//! Business logic services

pub mod activity;
pub mod geo;
pub mod optimizer;
pub mod rate_limiter;
pub mod routing;
pub mod sequencing;
pub mod stop_lifecycle;
