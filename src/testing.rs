//! In-memory fakes for the upstream capabilities (testing only)
//!
//! `FakeBuildServer`, `FakeSourceHost` and `FakeImageRegistry` answer from
//! canned data and record what they were asked.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CorrelatorError, Result};
use crate::images::TaggedImage;
use crate::model::CommitDetails;
use crate::providers::jenkins::{Branch, Revision, ScmAction, ScmBuild};
use crate::providers::{BuildServer, ImageRegistry, JenkinsBuild, ScmDetails, SourceHost};
use crate::resilience::encode_path;

type ErrorFactory = Box<dyn Fn() -> CorrelatorError + Send + Sync>;

fn not_found(what: String) -> CorrelatorError {
    CorrelatorError::NotFound(what)
}

pub fn server_error() -> CorrelatorError {
    CorrelatorError::Api {
        status: 500,
        message: "internal error".into(),
    }
}

// ---------------------------------------------------------------------------
// FakeBuildServer
// ---------------------------------------------------------------------------

/// Build server keyed by encoded job name.
#[derive(Default)]
pub struct FakeBuildServer {
    builds: HashMap<String, Vec<JenkinsBuild>>,
    /// Served in order; the last response repeats.
    scm_responses: Mutex<VecDeque<ScmDetails>>,
    scm_error: Option<ErrorFactory>,
    list_error: Option<ErrorFactory>,
    logs: HashMap<(String, String), Vec<u8>>,
    log_error: Option<ErrorFactory>,
    requested_jobs: Mutex<Vec<String>>,
    scm_calls: AtomicUsize,
}

impl FakeBuildServer {
    pub fn with_build(mut self, job: &str, number: u64) -> Self {
        self.builds
            .entry(encode_path(job))
            .or_default()
            .push(jenkins_build(number));
        self
    }

    pub fn with_scm(self, details: ScmDetails) -> Self {
        self.with_scm_sequence(vec![details])
    }

    pub fn with_scm_sequence(self, responses: Vec<ScmDetails>) -> Self {
        *self.scm_responses.lock().unwrap() = responses.into();
        self
    }

    pub fn with_scm_error(mut self, error: impl Fn() -> CorrelatorError + Send + Sync + 'static) -> Self {
        self.scm_error = Some(Box::new(error));
        self
    }

    pub fn with_list_error(mut self, error: impl Fn() -> CorrelatorError + Send + Sync + 'static) -> Self {
        self.list_error = Some(Box::new(error));
        self
    }

    pub fn with_log(mut self, job: &str, build_number: &str, body: &[u8]) -> Self {
        self.logs.insert(
            (encode_path(job), encode_path(build_number)),
            body.to_vec(),
        );
        self
    }

    pub fn with_log_error(mut self, error: impl Fn() -> CorrelatorError + Send + Sync + 'static) -> Self {
        self.log_error = Some(Box::new(error));
        self
    }

    /// Job names as received, i.e. after encoding.
    pub fn requested_jobs(&self) -> Vec<String> {
        self.requested_jobs.lock().unwrap().clone()
    }

    pub fn scm_calls(&self) -> usize {
        self.scm_calls.load(Ordering::SeqCst)
    }

    fn record(&self, job: &str) {
        self.requested_jobs.lock().unwrap().push(job.to_string());
    }
}

#[async_trait]
impl BuildServer for FakeBuildServer {
    async fn list_builds(&self, job: &str) -> Result<Vec<JenkinsBuild>> {
        self.record(job);
        if let Some(error) = &self.list_error {
            return Err(error());
        }
        self.builds
            .get(job)
            .cloned()
            .ok_or_else(|| not_found(format!("job {job}")))
    }

    async fn get_build(&self, job: &str, build_number: u64) -> Result<JenkinsBuild> {
        self.record(job);
        self.builds
            .get(job)
            .and_then(|builds| builds.iter().find(|b| b.number == build_number))
            .cloned()
            .ok_or_else(|| not_found(format!("build {job}#{build_number}")))
    }

    async fn get_scm_details(&self, _job: &str, _build_number: u64) -> Result<ScmDetails> {
        self.scm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.scm_error {
            return Err(error());
        }
        let mut responses = self.scm_responses.lock().unwrap();
        let details = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        Ok(details.unwrap_or_default())
    }

    async fn get_build_log(&self, job: &str, build_number: &str) -> Result<Vec<u8>> {
        self.record(job);
        if let Some(error) = &self.log_error {
            return Err(error());
        }
        self.logs
            .get(&(job.to_string(), build_number.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("log {job}#{build_number}")))
    }
}

// ---------------------------------------------------------------------------
// FakeSourceHost
// ---------------------------------------------------------------------------

/// Source host answering the same commit for every sha of a known repo.
#[derive(Default)]
pub struct FakeSourceHost {
    commits: HashMap<(String, String), CommitDetails>,
    failing: Vec<(String, String)>,
    lookups: Mutex<Vec<String>>,
}

impl FakeSourceHost {
    pub fn with_commit(mut self, project: &str, repo: &str, commit: CommitDetails) -> Self {
        self.commits
            .insert((project.to_string(), repo.to_string()), commit);
        self
    }

    pub fn failing_for(mut self, project: &str, repo: &str) -> Self {
        self.failing.push((project.to_string(), repo.to_string()));
        self
    }

    /// `project/repo@sha` for every lookup made.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHost for FakeSourceHost {
    async fn get_commit_details(
        &self,
        project: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetails> {
        self.lookups
            .lock()
            .unwrap()
            .push(format!("{project}/{repo}@{sha}"));

        let key = (project.to_string(), repo.to_string());
        if self.failing.contains(&key) {
            return Err(CorrelatorError::Api {
                status: 500,
                message: "not found".into(),
            });
        }
        self.commits
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(format!("commit {project}/{repo}@{sha}")))
    }
}

// ---------------------------------------------------------------------------
// FakeImageRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeImageRegistry {
    images: Vec<(String, Vec<TaggedImage>)>,
    failing: bool,
}

impl FakeImageRegistry {
    pub fn with_account(mut self, account: &str, images: Vec<TaggedImage>) -> Self {
        self.images.push((account.to_string(), images));
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl ImageRegistry for FakeImageRegistry {
    async fn list_accounts(&self) -> Result<Vec<String>> {
        Ok(self.images.iter().map(|(account, _)| account.clone()).collect())
    }

    async fn list_images(&self, account: &str) -> Result<Vec<TaggedImage>> {
        if self.failing {
            return Err(not_found(format!("images for {account}")));
        }
        Ok(self
            .images
            .iter()
            .find(|(name, _)| name == account)
            .map(|(_, images)| images.clone())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn jenkins_build(number: u64) -> JenkinsBuild {
    JenkinsBuild {
        number,
        result: Some("SUCCESS".to_string()),
        building: false,
        timestamp: Some(1_613_503_078_265),
        duration: 37527,
        url: "some-url".to_string(),
    }
}

/// SCM details with one git action that built `branch` at `sha`.
pub fn scm_details(remote_url: &str, branch: &str, sha: &str) -> ScmDetails {
    ScmDetails {
        actions: vec![Some(ScmAction {
            remote_urls: vec![remote_url.to_string()],
            last_built_revision: None,
            build: Some(ScmBuild {
                revision: Some(Revision {
                    branch: vec![Branch {
                        name: branch.to_string(),
                        sha1: sha.to_string(),
                    }],
                }),
            }),
        })],
    }
}

pub fn tagged_image(repo: &str, build_number: &str, commit_sha: &str, digest: &str) -> TaggedImage {
    TaggedImage {
        account: "some-account".to_string(),
        registry: "registry.example.com".to_string(),
        repository: repo.to_string(),
        tag: "latest".to_string(),
        digest: digest.to_string(),
        branch: Some("main".to_string()),
        build_number: Some(build_number.to_string()),
        commit_id: Some(commit_sha.to_string()),
        artifact: None,
    }
}

pub fn commit_details() -> CommitDetails {
    CommitDetails {
        sha: "some-sha".to_string(),
        author_name: Some("some-name".to_string()),
        message: Some("some-message".to_string()),
        author_date: DateTime::parse_from_rfc3339("2021-02-16T19:17:58Z")
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        html_url: Some("some-html-url".to_string()),
    }
}
