use async_trait::async_trait;
use reqwest::Client;

use crate::config::{HttpConfig, JenkinsHost};
use crate::error::{CorrelatorError, Result};
use crate::providers::{check_status, decode_json, BuildServer};

use super::types::{BuildsList, JenkinsBuild, ScmDetails};

const BUILD_FIELDS: &str = "number,url,duration,timestamp,result,building";
const SCM_TREE: &str = "actions[remoteUrls,lastBuiltRevision[branch[name,SHA1]],build[revision[branch[name,SHA1]]]]";

/// Jenkins JSON API client for a single configured host.
pub struct JenkinsClient {
    client: Client,
    address: String,
    credentials: Option<(String, Option<String>)>,
}

impl JenkinsClient {
    pub fn new(host: &JenkinsHost, http: &HttpConfig) -> Result<Self> {
        let client = http.client_builder().build().map_err(|e| {
            CorrelatorError::Config(format!("Failed to create HTTP client: {e}"))
        })?;

        url::Url::parse(&host.address).map_err(|e| {
            CorrelatorError::Config(format!("Invalid Jenkins address '{}': {e}", host.address))
        })?;

        Ok(Self {
            client,
            address: host.address.trim_end_matches('/').to_string(),
            credentials: host
                .username
                .clone()
                .map(|user| (user, host.password.clone())),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}/{path}", self.address));
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl BuildServer for JenkinsClient {
    async fn list_builds(&self, job: &str) -> Result<Vec<JenkinsBuild>> {
        let what = format!("job {job}");
        let tree = format!("builds[{BUILD_FIELDS}]");
        let response = self
            .get(&format!("job/{job}/api/json"))
            .query(&[("tree", tree.as_str())])
            .send()
            .await?;

        let list: BuildsList = decode_json(check_status(response, &what).await?, &what).await?;
        Ok(list.builds)
    }

    async fn get_build(&self, job: &str, build_number: u64) -> Result<JenkinsBuild> {
        let what = format!("build {job}#{build_number}");
        let response = self
            .get(&format!("job/{job}/{build_number}/api/json"))
            .query(&[("tree", BUILD_FIELDS)])
            .send()
            .await?;

        decode_json(check_status(response, &what).await?, &what).await
    }

    async fn get_scm_details(&self, job: &str, build_number: u64) -> Result<ScmDetails> {
        let what = format!("git details for {job}#{build_number}");
        let response = self
            .get(&format!("job/{job}/{build_number}/api/json"))
            .query(&[("tree", SCM_TREE)])
            .send()
            .await?;

        decode_json(check_status(response, &what).await?, &what).await
    }

    async fn get_build_log(&self, job: &str, build_number: &str) -> Result<Vec<u8>> {
        let what = format!("console output for {job}#{build_number}");
        let response = self
            .get(&format!("job/{job}/{build_number}/consoleText"))
            .send()
            .await?;

        let body = check_status(response, &what).await?.bytes().await?;
        Ok(body.to_vec())
    }
}
