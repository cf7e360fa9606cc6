use std::sync::LazyLock;

use regex::Regex;

// prefix (scheme:// or user@ or nothing), host, separator, project, repo
static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+://|\w+@|)(.+?)(:|/)(.+?)/(.+)").expect("remote url pattern is valid")
});

/// A remote URL split into the parts the source host is queried by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub prefix: String,
    pub host: String,
    pub project: String,
    pub repo: String,
}

/// Parses `scheme://host/project/repo`, `user@host:project/repo` and bare
/// `host/project/repo` URLs, with or without a trailing `.git`.
///
/// Returns `None` when the URL has no `project/repo` pair after the host.
pub fn resolve(remote_url: &str) -> Option<RemoteRef> {
    let caps = REMOTE_URL.captures(remote_url)?;
    let repo = &caps[5];

    Some(RemoteRef {
        prefix: caps[1].to_string(),
        host: caps[2].to_string(),
        project: caps[4].to_string(),
        repo: repo.strip_suffix(".git").unwrap_or(repo).to_string(),
    })
}
