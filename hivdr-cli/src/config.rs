use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hivdr_core::models::Locus;
use hivdr_io::OutputFormat;
use hivdr_scoring::TokenPolicy;

///
/// Settings of a scoring run, read from TOML. Every field is optional and
/// command line flags take precedence over it.
///
#[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
pub struct RunConfig {
    /// Relative paths are resolved against the directory of the config file.
    pub reference_dir: Option<PathBuf>,
    pub loci: Option<Vec<Locus>>,
    pub token_policy: Option<TokenPolicy>,
    pub emit_all_drugs: Option<bool>,
    pub threads: Option<usize>,
    pub output_format: Option<OutputFormat>,
}

#[derive(Error, Debug)]
pub enum RunConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("threads must be at least 1")]
    ZeroThreads,
}

pub type RunConfigResult<T> = std::result::Result<T, RunConfigError>;

impl TryFrom<&Path> for RunConfig {
    type Error = RunConfigError;

    fn try_from(path: &Path) -> RunConfigResult<Self> {
        let toml_str = read_to_string(path)?;
        let mut config: RunConfig = toml::from_str(&toml_str)?;

        if config.threads == Some(0) {
            return Err(RunConfigError::ZeroThreads);
        }

        if let (Some(dir), Some(parent)) = (&config.reference_dir, path.parent()) {
            if dir.is_relative() {
                config.reference_dir = Some(parent.join(dir));
            }
        }

        Ok(config)
    }
}
