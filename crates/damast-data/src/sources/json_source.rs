//! Dataset supplier reading the endpoint's JSON document from disk

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::DatasetSource;
use crate::filter::FilterState;
use crate::model::RawDataset;
use crate::state::VisualizationState;
use crate::DataError;

/// JSON file source, optionally paired with a saved visualization state
pub struct JsonFileSource {
    path: PathBuf,
    state_path: Option<PathBuf>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state_path: None,
        }
    }

    /// Replay the filters of a stored visualization state after loading
    pub fn with_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DatasetSource for JsonFileSource {
    async fn fetch(&self) -> Result<RawDataset, DataError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let raw: RawDataset = serde_json::from_str(&text)?;
        info!(
            path = %self.path.display(),
            places = raw.places.len(),
            tuples = raw.tuples.len(),
            "read dataset"
        );
        Ok(raw)
    }

    async fn saved_state(&self) -> Result<Option<FilterState>, DataError> {
        let Some(path) = &self.state_path else {
            return Ok(None);
        };
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Some(VisualizationState::from_json(&text)?.filters))
    }

    fn source_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.json")
    }
}
