mod client;
mod types;

pub use client::JenkinsClient;
pub use types::{Branch, JenkinsBuild, Revision, ScmAction, ScmBuild, ScmDetails};
