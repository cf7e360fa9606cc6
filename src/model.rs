use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Final status of a build as seen by the deployment orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Success,
    Failure,
    Running,
    Aborted,
    #[default]
    Unknown,
}

impl BuildStatus {
    /// Maps a Jenkins `result` field. A build still in progress reports no
    /// result, so `building` takes precedence.
    pub fn from_jenkins(result: Option<&str>, building: bool) -> Self {
        if building {
            return Self::Running;
        }
        match result {
            Some("SUCCESS") => Self::Success,
            Some("FAILURE" | "UNSTABLE") => Self::Failure,
            Some("ABORTED") => Self::Aborted,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Running => "RUNNING",
            Self::Aborted => "ABORTED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A build enriched with commit and image provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    /// Composite key `{job}-{number}`
    pub id: String,
    /// Jenkins job name
    pub name: String,
    pub number: u64,
    pub status: BuildStatus,
    pub timestamp: Option<DateTime<Utc>>,
    /// Duration in milliseconds
    pub duration: u64,
    pub url: String,
    pub properties: IndexMap<String, String>,
    pub git_revisions: Vec<GitRevision>,
    pub artifacts: Vec<Artifact>,
}

/// A revision the build server reports as built, optionally enriched with
/// commit details from the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRevision {
    /// Ref as reported, e.g. `refs/remotes/origin/main`
    pub name: String,
    /// Short branch name
    pub branch: String,
    pub sha1: String,
    pub remote_url: String,
    pub committer: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub compare_url: Option<String>,
}

impl GitRevision {
    pub fn new(name: &str, sha1: &str, remote_url: &str) -> Self {
        let branch = name.rsplit('/').next().unwrap_or(name).to_string();
        Self {
            name: name.to_string(),
            branch,
            sha1: sha1.to_string(),
            remote_url: remote_url.to_string(),
            committer: None,
            message: None,
            timestamp: None,
            compare_url: None,
        }
    }

    pub fn with_commit(self, commit: &CommitDetails) -> Self {
        Self {
            committer: commit.author_name.clone(),
            message: commit.message.clone(),
            timestamp: commit.author_date,
            compare_url: commit.html_url.clone(),
            ..self
        }
    }
}

/// Commit metadata returned by the source host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitDetails {
    pub sha: String,
    pub author_name: Option<String>,
    pub message: Option<String>,
    pub author_date: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
}

pub const DOCKER_ARTIFACT: &str = "docker";

/// A container image produced by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    /// Repository path in the registry
    pub name: String,
    /// Image tag
    pub version: String,
    /// Content digest
    pub reference: String,
    pub url: String,
    pub display_path: String,
}

/// Raw console output of a build. Empty map when the build id cannot be
/// parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BuildOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl BuildOutput {
    pub fn log(text: impl Into<String>) -> Self {
        Self {
            log: Some(text.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_none()
    }
}
