use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use log::{debug, error, info};
use regex::Regex;

use crate::config::{Config, ResilienceConfig};
use crate::error::Result;
use crate::images::{find_artifact, resolve_job_name, TaggedImage};
use crate::model::{Artifact, BuildOutput, BuildRecord, GitRevision};
use crate::providers::{
    fetch_all_images, BuildServer, ClouddriverClient, GitHubClient, ImageRegistry, JenkinsClient,
    SourceHost,
};
use crate::remote::{self, RemoteRef};
use crate::resilience::{BreakerRegistry, BuildServerGate};

pub const PROJECT_KEY: &str = "projectKey";
pub const REPO_SLUG: &str = "repoSlug";

// greedy job group: the split happens at the last hyphen
static BUILD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-(.+)$").expect("build id pattern is valid"));

/// Joins Jenkins builds with GitHub commits and registry images.
///
/// Each query runs its upstream calls one after another; the only state
/// shared between queries is the circuit breaker health of the Jenkins
/// host.
pub struct BuildCorrelator {
    gate: BuildServerGate,
    source_host: Arc<dyn SourceHost>,
    registry: Arc<dyn ImageRegistry>,
    breakers: BreakerRegistry,
}

/// What enriching one revision produced.
#[derive(Debug)]
struct RevisionOutcome {
    revision: GitRevision,
    /// Set only when the commit lookup succeeded
    source: Option<RemoteRef>,
    artifact: Option<Artifact>,
}

impl RevisionOutcome {
    fn unchanged(revision: GitRevision) -> Self {
        Self {
            revision,
            source: None,
            artifact: None,
        }
    }
}

#[derive(Debug, Default)]
struct Correlation {
    properties: IndexMap<String, String>,
    revisions: Vec<GitRevision>,
    artifacts: Vec<Artifact>,
}

/// Folds revision outcomes in order. `projectKey` and `repoSlug` end up
/// describing the last enriched revision.
fn correlate(outcomes: Vec<RevisionOutcome>) -> Correlation {
    outcomes
        .into_iter()
        .fold(Correlation::default(), |mut acc, outcome| {
            if let Some(source) = outcome.source {
                acc.properties.insert(PROJECT_KEY.to_string(), source.project);
                acc.properties.insert(REPO_SLUG.to_string(), source.repo);
            }
            acc.artifacts.extend(outcome.artifact);
            acc.revisions.push(outcome.revision);
            acc
        })
}

impl BuildCorrelator {
    /// Creates a correlator for the Jenkins host identified by `host_id`.
    pub fn new(
        host_id: &str,
        build_server: Arc<dyn BuildServer>,
        source_host: Arc<dyn SourceHost>,
        registry: Arc<dyn ImageRegistry>,
        resilience: &ResilienceConfig,
    ) -> Self {
        let breakers = BreakerRegistry::new(resilience.breaker());
        let breaker = breakers.breaker(&format!("jenkins-{host_id}"));

        Self {
            gate: BuildServerGate::new(build_server, breaker, resilience.retry()),
            source_host,
            registry,
            breakers,
        }
    }

    /// Resolves the upstreams from configuration and builds their clients.
    ///
    /// # Errors
    ///
    /// Fails when no Jenkins host is CI-enabled or a client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = config.ci_host()?;
        info!("Using Jenkins host '{}' at {}", host.name, host.address);

        let jenkins = JenkinsClient::new(host, &config.http)?;
        let github = GitHubClient::new(&config.github, &config.http)?;
        let clouddriver = ClouddriverClient::new(&config.registry, &config.http)?;

        Ok(Self::new(
            &host.name,
            Arc::new(jenkins),
            Arc::new(github),
            Arc::new(clouddriver),
            &config.resilience,
        ))
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Lists builds of `job_key`, enriched with commits and images.
    ///
    /// With a `build_number`, only that build is returned. Its job is looked
    /// up from image labels matching the build number and `commit_id`,
    /// falling back to `job_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image inventory, the build listing or a build
    /// cannot be fetched.
    pub async fn list_builds(
        &self,
        job_key: &str,
        build_number: Option<u64>,
        commit_id: Option<&str>,
    ) -> Result<Vec<BuildRecord>> {
        let images = fetch_all_images(self.registry.as_ref()).await?;
        debug!("Correlating against {} images", images.len());

        if let Some(build_number) = build_number {
            let job = resolve_job_name(&images, build_number, commit_id)
                .unwrap_or_else(|| job_key.to_string());
            info!("Getting git details with jobName {job} and buildNumber {build_number}");

            return Ok(vec![self.enrich(&job, build_number, &images).await?]);
        }

        let builds = self.gate.list_builds(job_key).await?;
        info!("Fetched {} builds for job {job_key}", builds.len());

        let mut records = Vec::with_capacity(builds.len());
        for build in builds {
            records.push(self.enrich(job_key, build.number, &images).await?);
        }
        Ok(records)
    }

    /// Fetches one build and enriches its revisions.
    ///
    /// Revisions whose remote cannot be parsed or whose commit cannot be
    /// fetched are returned as reported by Jenkins.
    ///
    /// # Errors
    ///
    /// Returns an error if the build itself cannot be fetched, or the git
    /// details lookup fails after retries.
    pub async fn enrich(
        &self,
        job: &str,
        build_number: u64,
        images: &[TaggedImage],
    ) -> Result<BuildRecord> {
        let build = self.gate.get_build(job, build_number).await?;
        let revisions = self.gate.scm_revisions(job, build_number).await?;

        let mut outcomes = Vec::with_capacity(revisions.len());
        for revision in revisions {
            outcomes.push(self.enrich_revision(revision, build_number, images).await);
        }
        let correlation = correlate(outcomes);

        Ok(BuildRecord {
            id: format!("{job}-{build_number}"),
            name: job.to_string(),
            number: build_number,
            status: build.status(),
            timestamp: build.started_at(),
            duration: build.duration,
            url: build.url,
            properties: correlation.properties,
            git_revisions: correlation.revisions,
            artifacts: correlation.artifacts,
        })
    }

    async fn enrich_revision(
        &self,
        revision: GitRevision,
        build_number: u64,
        images: &[TaggedImage],
    ) -> RevisionOutcome {
        let Some(source) = remote::resolve(&revision.remote_url) else {
            debug!("Skipping unrecognised remote url '{}'", revision.remote_url);
            return RevisionOutcome::unchanged(revision);
        };

        let commit = match self
            .source_host
            .get_commit_details(&source.project, &source.repo, &revision.sha1)
            .await
        {
            Ok(commit) => commit,
            Err(e) => {
                error!(
                    "Failed to fetch commit {} from {}/{}: {e}",
                    revision.sha1, source.project, source.repo
                );
                return RevisionOutcome::unchanged(revision);
            }
        };

        let artifact = find_artifact(images, build_number, &commit.sha);
        RevisionOutcome {
            revision: revision.with_commit(&commit),
            source: Some(source),
            artifact,
        }
    }

    /// Console output of a build identified as `{job}-{number}`.
    ///
    /// Returns an empty output when the id cannot be split, and an empty log
    /// when the fetch fails.
    pub async fn get_build_output(&self, build_id: &str) -> BuildOutput {
        let Some(caps) = BUILD_ID.captures(build_id) else {
            debug!("Unrecognised build id '{build_id}'");
            return BuildOutput::default();
        };
        let (job, build_number) = (&caps[1], &caps[2]);

        match self.gate.build_log(job, build_number).await {
            Ok(bytes) => BuildOutput::log(String::from_utf8_lossy(&bytes)),
            Err(e) => {
                error!("Failed to fetch console output for {build_id}: {e}");
                BuildOutput::log("")
            }
        }
    }
}
