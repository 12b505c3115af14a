use thiserror::Error;

/// Failures at the reading-store boundary. The analysis core never retries;
/// callers decide whether to keep prior output or try again later.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached at all.
    #[error("reading store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the query or row decoding failed.
    #[error("reading store query failed: {0:#}")]
    Query(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("lag must be at least 1")]
    ZeroLag,

    #[error("threshold must be a finite, non-negative multiplier (got {0})")]
    InvalidThreshold(f64),

    #[error("{name} must be finite and greater than zero (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("lux breakpoints must satisfy 0 <= dark <= dim < bright (got {dark}, {dim}, {bright})")]
    UnorderedBreakpoints { dark: f64, dim: f64, bright: f64 },

    #[error("{name} must be greater than zero")]
    EmptyWindow { name: &'static str },

    #[error("UTC offset of {0} seconds is out of range")]
    InvalidUtcOffset(i32),
}
