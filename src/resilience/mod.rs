//! Protection for calls to the build server.
//!
//! - [`breaker`]: per-host [`CircuitBreaker`] and the [`BreakerRegistry`] that owns them
//! - [`retry`]: fixed-backoff [`RetryPolicy`]
//! - [`gate`]: [`BuildServerGate`], the only path from the correlator to Jenkins

pub mod breaker;
pub mod gate;
pub mod retry;

pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker};
pub use gate::{encode_path, BuildServerGate};
pub use retry::RetryPolicy;
