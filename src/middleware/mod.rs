/// Middleware module
///
/// Custom middleware for request-level concerns.

mod metrics;

pub use metrics::MetricsMiddleware;
