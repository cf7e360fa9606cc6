use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{Artifact, DOCKER_ARTIFACT};

/// An image from the registry inventory, with the provenance the build
/// stamped on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaggedImage {
    #[serde(deserialize_with = "null_as_empty")]
    pub account: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub registry: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub repository: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub tag: String,
    /// Empty when the registry could not read the manifest
    #[serde(deserialize_with = "null_as_empty")]
    pub digest: String,
    pub branch: Option<String>,
    pub build_number: Option<String>,
    pub commit_id: Option<String>,
    #[serde(deserialize_with = "lenient_artifact")]
    pub artifact: Option<ImageArtifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageArtifact {
    pub metadata: Option<ImageMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    pub labels: Option<ImageLabels>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageLabels {
    pub build_number: Option<String>,
    pub commit_id: Option<String>,
    pub job_name: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Registries attach arbitrary metadata. Anything that does not fit the
// metadata/labels shape is treated as having no labels.
fn lenient_artifact<'de, D>(deserializer: D) -> Result<Option<ImageArtifact>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl TaggedImage {
    /// The label bundle under `artifact.metadata.labels`, if every level is
    /// present.
    pub fn labels(&self) -> Option<&ImageLabels> {
        self.artifact.as_ref()?.metadata.as_ref()?.labels.as_ref()
    }
}

/// Registry v2 blob URL for an image digest.
pub fn blob_url(registry: &str, repository: &str, digest: &str) -> String {
    format!("https://{registry}/v2/{repository}/blobs/{digest}")
}

/// Returns the first image built by `build_number` from `commit_id`.
pub fn find_artifact(images: &[TaggedImage], build_number: u64, commit_id: &str) -> Option<Artifact> {
    let build_number = build_number.to_string();

    images
        .iter()
        .find(|image| {
            image.build_number.as_deref() == Some(build_number.as_str())
                && image.commit_id.as_deref() == Some(commit_id)
        })
        .map(|image| {
            let url = blob_url(&image.registry, &image.repository, &image.digest);
            Artifact {
                kind: DOCKER_ARTIFACT.to_string(),
                name: image.repository.clone(),
                version: image.tag.clone(),
                reference: image.digest.clone(),
                display_path: url.clone(),
                url,
            }
        })
}

/// Finds the job that produced an image by its labels. The first image whose
/// labels carry both the build number and the commit id decides.
pub fn resolve_job_name(
    images: &[TaggedImage],
    build_number: u64,
    commit_id: Option<&str>,
) -> Option<String> {
    let commit_id = commit_id?;
    let build_number = build_number.to_string();

    let labels = images.iter().filter_map(TaggedImage::labels).find(|labels| {
        labels.build_number.as_deref() == Some(build_number.as_str())
            && labels.commit_id.as_deref() == Some(commit_id)
    })?;

    log::info!("found matching image with buildNumber {build_number} and commitId {commit_id}");
    log::debug!("labels: {labels:?}");

    labels.job_name.clone()
}
