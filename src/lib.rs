//! Correlates Jenkins builds with the GitHub commits they built and the
//! container images they produced.

pub mod config;
pub mod correlator;
pub mod error;
pub mod images;
pub mod model;
pub mod providers;
pub mod remote;
pub mod resilience;

#[cfg(test)]
pub mod testing;

pub use config::Config;
pub use correlator::BuildCorrelator;
pub use error::{CorrelatorError, Result};
pub use model::{Artifact, BuildOutput, BuildRecord, BuildStatus, GitRevision};
