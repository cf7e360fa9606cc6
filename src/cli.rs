use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use buildlens::{BuildCorrelator, Config};

use crate::output::builds_table;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Parser)]
#[command(name = "buildlens")]
#[command(author, version, about = "Jenkins build correlator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (toml, json or yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    #[arg(short, long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Password for the CI-enabled Jenkins host
    #[arg(long, global = true, env = "JENKINS_PASSWORD", hide_env_values = true)]
    jenkins_password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List builds of a job, enriched with commits and images
    Builds {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build_number: Option<u64>,

        /// Commit the image for `--build-number` was built from
        #[arg(long)]
        commit_id: Option<String>,
    },
    /// Console output of a build, given as `{job}-{number}`
    Output { build_id: String },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(token) = &self.github_token {
            config.github.token = Some(token.clone());
        }
        if let Some(password) = &self.jenkins_password {
            if let Some(host) = config.jenkins.iter_mut().find(|h| h.ci_enabled) {
                host.password = Some(password.clone());
            }
        }
        Ok(config)
    }

    fn emit(&self, text: String) -> Result<()> {
        if let Some(output_path) = &self.output {
            std::fs::write(output_path, text)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Results written to: {}", output_path.display());
        } else {
            println!("{text}");
        }
        Ok(())
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }

    async fn execute_builds(
        &self,
        correlator: &BuildCorrelator,
        job: &str,
        build_number: Option<u64>,
        commit_id: Option<&str>,
    ) -> Result<()> {
        info!("Correlating builds for job: {job}");

        let records = correlator
            .list_builds(job, build_number, commit_id)
            .await
            .with_context(|| format!("Failed to list builds for {job}"))?;

        let text = match self.format {
            Format::Json => self.to_json(&records)?,
            Format::Table => builds_table(&records).to_string(),
        };
        self.emit(text)
    }

    async fn execute_output(&self, correlator: &BuildCorrelator, build_id: &str) -> Result<()> {
        let output = correlator.get_build_output(build_id).await;

        let text = match self.format {
            Format::Json => self.to_json(&output)?,
            Format::Table => output.log.unwrap_or_default(),
        };
        self.emit(text)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let correlator = BuildCorrelator::from_config(&config)?;

        match &self.command {
            Commands::Builds {
                job,
                build_number,
                commit_id,
            } => {
                self.execute_builds(&correlator, job, *build_number, commit_id.as_deref())
                    .await
            }
            Commands::Output { build_id } => self.execute_output(&correlator, build_id).await,
        }
    }
}
