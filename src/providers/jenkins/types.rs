use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{BuildStatus, GitRevision};

/// A Jenkins build as returned by `/job/{job}/{n}/api/json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JenkinsBuild {
    pub number: u64,
    /// `SUCCESS`, `FAILURE`, `UNSTABLE`, `ABORTED`, `NOT_BUILT`, or absent
    /// while building
    pub result: Option<String>,
    pub building: bool,
    /// Start time in epoch milliseconds
    pub timestamp: Option<i64>,
    /// Duration in milliseconds
    pub duration: u64,
    pub url: String,
}

impl JenkinsBuild {
    pub fn status(&self) -> BuildStatus {
        BuildStatus::from_jenkins(self.result.as_deref(), self.building)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct BuildsList {
    pub builds: Vec<JenkinsBuild>,
}

/// Git plugin build data for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmDetails {
    /// Actions filtered by the `tree` query come back as empty objects or
    /// nulls.
    pub actions: Vec<Option<ScmAction>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScmAction {
    pub remote_urls: Vec<String>,
    pub last_built_revision: Option<Revision>,
    pub build: Option<ScmBuild>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmBuild {
    pub revision: Option<Revision>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Revision {
    pub branch: Vec<Branch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub name: String,
    #[serde(rename = "SHA1")]
    pub sha1: String,
}

impl ScmDetails {
    /// One revision per built branch, tagged with the action's first remote
    /// URL. Repeated (ref, sha, remote) triples are reported once.
    pub fn revisions(&self) -> Vec<GitRevision> {
        let mut revisions: Vec<GitRevision> = Vec::new();

        for action in self.actions.iter().flatten() {
            let revision = action
                .last_built_revision
                .as_ref()
                .or_else(|| action.build.as_ref().and_then(|b| b.revision.as_ref()));
            let Some(revision) = revision else {
                continue;
            };
            let remote_url = action.remote_urls.first().map(String::as_str).unwrap_or("");

            for branch in revision.branch.iter().filter(|b| !b.name.is_empty()) {
                let candidate = GitRevision::new(&branch.name, &branch.sha1, remote_url);
                if !revisions.contains(&candidate) {
                    revisions.push(candidate);
                }
            }
        }

        revisions
    }
}
