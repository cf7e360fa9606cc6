use serde::Deserialize;

pub(super) const DOCKER_REGISTRY_TYPE: &str = "dockerRegistry";

/// An entry of `GET /credentials`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Account {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Account {
    pub fn is_docker_registry(&self) -> bool {
        self.kind.as_deref() == Some(DOCKER_REGISTRY_TYPE)
    }
}
