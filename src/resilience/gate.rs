use std::sync::Arc;

use log::{debug, warn};

use crate::error::Result;
use crate::model::GitRevision;
use crate::providers::{BuildServer, JenkinsBuild};

use super::{CircuitBreaker, RetryPolicy};

/// Encodes a job name or build token for a URL path. Folder separators are
/// kept.
pub fn encode_path(raw: &str) -> String {
    raw.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every call that reaches the build server goes through here: names are
/// encoded and the host's circuit breaker sees the outcome.
pub struct BuildServerGate {
    server: Arc<dyn BuildServer>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl BuildServerGate {
    pub fn new(server: Arc<dyn BuildServer>, breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self {
            server,
            breaker,
            retry,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn list_builds(&self, job: &str) -> Result<Vec<JenkinsBuild>> {
        let job = encode_path(job);
        self.breaker.call(|| self.server.list_builds(&job)).await
    }

    pub async fn get_build(&self, job: &str, build_number: u64) -> Result<JenkinsBuild> {
        let job = encode_path(job);
        self.breaker
            .call(|| self.server.get_build(&job, build_number))
            .await
    }

    pub async fn build_log(&self, job: &str, build_number: &str) -> Result<Vec<u8>> {
        let job = encode_path(job);
        let build_number = encode_path(build_number);
        self.breaker
            .call(|| self.server.get_build_log(&job, &build_number))
            .await
    }

    /// Revisions the build checked out, retried under the retry policy.
    ///
    /// A response that cannot be decoded is not retried and, like a missing
    /// endpoint, yields no revisions. Other failures are retried and the last
    /// one is returned.
    pub async fn scm_revisions(&self, job: &str, build_number: u64) -> Result<Vec<GitRevision>> {
        let encoded = encode_path(job);
        let job = encoded.as_str();
        let server = self.server.as_ref();
        let breaker = self.breaker.as_ref();

        let details = self
            .retry
            .retry(move || async move {
                match breaker
                    .call(|| server.get_scm_details(job, build_number))
                    .await
                {
                    Ok(details) => Ok(Some(details)),
                    Err(e) if e.is_decode() => {
                        warn!("Unreadable git details for {job}#{build_number}: {e}");
                        Ok(None)
                    }
                    Err(e) if e.is_not_found() => {
                        debug!("No git details for {job}#{build_number}");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        Ok(details.map(|d| d.revisions()).unwrap_or_default())
    }
}
