use async_trait::async_trait;
use reqwest::Client;

use crate::config::{HttpConfig, RegistryConfig};
use crate::error::{CorrelatorError, Result};
use crate::images::TaggedImage;
use crate::providers::{check_status, decode_json, ImageRegistry};

use super::types::Account;

/// Lists docker registry accounts and their tagged images through
/// Clouddriver.
pub struct ClouddriverClient {
    client: Client,
    base_url: String,
}

impl ClouddriverClient {
    pub fn new(config: &RegistryConfig, http: &HttpConfig) -> Result<Self> {
        let client = http
            .client_builder()
            .build()
            .map_err(|e| CorrelatorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ImageRegistry for ClouddriverClient {
    async fn list_accounts(&self) -> Result<Vec<String>> {
        let what = "registry accounts";
        let response = self
            .client
            .get(format!("{}/credentials", self.base_url))
            .send()
            .await?;

        let accounts: Vec<Account> = decode_json(check_status(response, what).await?, what).await?;

        Ok(accounts
            .into_iter()
            .filter(Account::is_docker_registry)
            .map(|a| a.name)
            .collect())
    }

    async fn list_images(&self, account: &str) -> Result<Vec<TaggedImage>> {
        let what = format!("images for account {account}");
        let response = self
            .client
            .get(format!("{}/dockerRegistry/images/find", self.base_url))
            .query(&[("account", account), ("includeDetails", "true")])
            .send()
            .await?;

        decode_json(check_status(response, &what).await?, &what).await
    }
}
