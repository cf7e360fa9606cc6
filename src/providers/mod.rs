//! Upstream capabilities the correlator consumes, and their HTTP clients.
//!
//! - [`BuildServer`]: Jenkins build listings, SCM details and console logs
//! - [`SourceHost`]: commit details from GitHub
//! - [`ImageRegistry`]: Clouddriver registry accounts and tagged images
//!
//! Job names reach a [`BuildServer`] already encoded for use in a URL path.

pub mod clouddriver;
pub mod github;
pub mod jenkins;

use async_trait::async_trait;

use crate::error::Result;
use crate::images::TaggedImage;
use crate::model::CommitDetails;

pub use clouddriver::ClouddriverClient;
pub use github::GitHubClient;
pub use jenkins::{JenkinsBuild, JenkinsClient, ScmDetails};

#[async_trait]
pub trait BuildServer: Send + Sync {
    async fn list_builds(&self, job: &str) -> Result<Vec<JenkinsBuild>>;

    async fn get_build(&self, job: &str, build_number: u64) -> Result<JenkinsBuild>;

    async fn get_scm_details(&self, job: &str, build_number: u64) -> Result<ScmDetails>;

    /// Raw console output. The build number is passed through as given by
    /// the caller.
    async fn get_build_log(&self, job: &str, build_number: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn get_commit_details(&self, project: &str, repo: &str, sha: &str)
        -> Result<CommitDetails>;
}

#[async_trait]
pub trait ImageRegistry: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<String>>;

    async fn list_images(&self, account: &str) -> Result<Vec<TaggedImage>>;
}

/// Fetches the images of every registry account, one request per account.
pub async fn fetch_all_images(registry: &dyn ImageRegistry) -> Result<Vec<TaggedImage>> {
    let mut images = Vec::new();
    for account in registry.list_accounts().await? {
        let found = registry.list_images(&account).await?;
        log::debug!("Fetched {} images for account {account}", found.len());
        images.extend(found);
    }
    Ok(images)
}

/// Maps a non-success HTTP response to the error taxonomy. 404 becomes
/// [`CorrelatorError::NotFound`](crate::error::CorrelatorError::NotFound).
pub(crate) async fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response> {
    use crate::error::CorrelatorError;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(CorrelatorError::NotFound(what.to_string()));
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(CorrelatorError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Reads a JSON body, reporting conversion failures as
/// [`CorrelatorError::Decode`](crate::error::CorrelatorError::Decode).
pub(crate) async fn decode_json<T>(response: reqwest::Response, what: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| crate::error::CorrelatorError::Decode(format!("{what}: {e}")))
}
