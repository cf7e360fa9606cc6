use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::{GitHubConfig, HttpConfig};
use crate::error::{CorrelatorError, Result};
use crate::model::CommitDetails;
use crate::providers::{check_status, decode_json, SourceHost};

use super::types::GitHubCommit;

/// GitHub REST client for commit lookups.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `config` - API base URL and optional personal access token
    /// * `http` - Shared HTTP settings (timeout, user agent)
    pub fn new(config: &GitHubConfig, http: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| CorrelatorError::Config(format!("Invalid GitHub token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = http
            .client_builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CorrelatorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn get_commit_details(
        &self,
        project: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetails> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.base_url,
            urlencoding::encode(project),
            urlencoding::encode(repo),
            urlencoding::encode(sha)
        );
        let what = format!("commit {project}/{repo}@{sha}");

        let response = self.client.get(&url).send().await?;
        let commit: GitHubCommit = decode_json(check_status(response, &what).await?, &what).await?;

        Ok(commit.into())
    }
}
