use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::CommitDetails;

/// Response of `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Deserialize)]
pub(super) struct GitHubCommit {
    pub sha: String,
    pub html_url: Option<String>,
    pub commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct CommitInfo {
    pub message: Option<String>,
    pub author: Option<GitActor>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitActor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl From<GitHubCommit> for CommitDetails {
    fn from(c: GitHubCommit) -> Self {
        let (author_name, author_date) = c
            .commit
            .author
            .map(|a| (a.name, a.date))
            .unwrap_or_default();

        Self {
            sha: c.sha,
            author_name,
            message: c.commit.message,
            author_date,
            html_url: c.html_url,
        }
    }
}
