//! Handoff to the downstream extractor.
//!
//! The miner never launches the extractor. It builds an [`ExtractorRequest`]
//! and passes it to a [`Handoff`] sink; how the request travels from there is
//! the sink's business. [`JsonFileHandoff`] writes the extractor's input file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::config::{MinerConfig, RepoSlug};
use crate::error::HandoffError;
use crate::pipeline::{IdentifierRange, MinedIssues};

/// File name of the extractor input inside the repository output directory.
pub const EXTRACTOR_INPUT_FILE: &str = "extractor_input.json";

/// Everything the extractor needs to mine one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorRequest {
    pub repo: RepoSlug,
    /// Inclusive `[min, max]`.
    pub range: IdentifierRange,
    /// Distinct issues that were actually announced, ascending.
    pub issues: Vec<u64>,
    /// Directory the extractor input and output live in.
    pub output: PathBuf,
}

impl ExtractorRequest {
    pub fn new(repo: RepoSlug, mined: &MinedIssues, output: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            range: mined.range(),
            issues: mined.issues().to_vec(),
            output: output.into(),
        }
    }

    /// Request for a run described by `config`.
    pub fn for_config(config: &MinerConfig, mined: &MinedIssues) -> Self {
        Self::new(config.parser.repo.clone(), mined, config.repo_output_dir())
    }

    /// Path of the extractor input file for this request.
    pub fn input_path(&self) -> PathBuf {
        self.output.join(EXTRACTOR_INPUT_FILE)
    }
}

/// Receives the request once per run, after the range is known.
#[async_trait]
pub trait Handoff: Send + Sync {
    /// Deliver the request. Returns where it was delivered.
    async fn submit(&self, request: &ExtractorRequest) -> Result<PathBuf, HandoffError>;
}

/// Merge `repo`, `range` and `issues` into the extractor settings object.
pub fn render_input(
    settings: &serde_json::Value,
    request: &ExtractorRequest,
) -> Result<serde_json::Value, HandoffError> {
    let serde_json::Value::Object(base) = settings else {
        return Err(HandoffError::InvalidSettings(settings.to_string()));
    };

    let mut input = base.clone();
    input.insert("repo".into(), serde_json::to_value(&request.repo)?);
    input.insert("range".into(), serde_json::to_value(request.range)?);
    input.insert("issues".into(), serde_json::to_value(&request.issues)?);
    Ok(serde_json::Value::Object(input))
}

/// Writes `extractor_input.json` into the request's output directory.
pub struct JsonFileHandoff {
    settings: serde_json::Value,
}

impl JsonFileHandoff {
    /// `settings` is the config file's `extractor` section.
    pub fn new(settings: serde_json::Value) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Handoff for JsonFileHandoff {
    async fn submit(&self, request: &ExtractorRequest) -> Result<PathBuf, HandoffError> {
        let input = render_input(&self.settings, request)?;
        let path = request.input_path();

        fs::create_dir_all(&request.output)
            .await
            .map_err(|source| write_error(&request.output, source))?;

        let text = serde_json::to_string_pretty(&input)?;
        fs::write(&path, text)
            .await
            .map_err(|source| write_error(&path, source))?;

        info!(path = %path.display(), range = %request.range, "Wrote extractor input");
        Ok(path)
    }
}

fn write_error(path: &Path, source: std::io::Error) -> HandoffError {
    HandoffError::Write {
        path: path.display().to_string(),
        source,
    }
}
