//! Exported visualization state documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::FilterState;
use crate::DataError;

/// Provenance marker written into every exported document
pub const EXPORT_SOURCE: &str = "visualization";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Report this state was generated for, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `{ metadata: { source, ... }, filters }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationState {
    pub metadata: StateMetadata,
    pub filters: FilterState,
}

impl VisualizationState {
    /// Wrap the current filters for export
    pub fn export(filters: FilterState) -> Self {
        Self {
            metadata: StateMetadata {
                source: EXPORT_SOURCE.to_string(),
                created: Some(Utc::now()),
                report_id: None,
                extra: serde_json::Map::new(),
            },
            filters,
        }
    }

    /// Re-export a previously imported document, keeping its extra
    /// metadata but rewriting its provenance
    pub fn reexport(mut self) -> Self {
        self.metadata.source = EXPORT_SOURCE.to_string();
        self.metadata.created = Some(Utc::now());
        self
    }

    pub fn from_json(text: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, DataError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a state import as reported to the UI:
/// `{ success: true }` or `{ success: false, error_message }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ImportOutcome {
    pub fn ok() -> Self {
        Self { success: true, error_message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()) }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for ImportOutcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}
