//! Message envelope exchanged between units
//!
//! All inter-unit traffic that crosses an open boundary (view main thread
//! <-> view unit) travels as an [`Envelope`]: `{ type, target?, source?, data }`.
//! The `type` tag is checked at runtime; an unknown tag is reported as
//! [`MessageError::Unsupported`] instead of being ignored.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at a message boundary
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("unsupported message type: {0}")]
    Unsupported(String),

    #[error("message `{kind}` is not handled by the {view} unit")]
    Unhandled { kind: MessageType, view: ViewKind },

    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// The views of the application, each served by one compute unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    LocationList,
    Map,
    Untimed,
    Timeline,
    Hierarchy,
    Sources,
    Tags,
    Confidence,
}

impl ViewKind {
    pub const ALL: [ViewKind; 8] = [
        ViewKind::LocationList,
        ViewKind::Map,
        ViewKind::Untimed,
        ViewKind::Timeline,
        ViewKind::Hierarchy,
        ViewKind::Sources,
        ViewKind::Tags,
        ViewKind::Confidence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::LocationList => "location-list",
            ViewKind::Map => "map",
            ViewKind::Untimed => "untimed",
            ViewKind::Timeline => "timeline",
            ViewKind::Hierarchy => "hierarchy",
            ViewKind::Sources => "sources",
            ViewKind::Tags => "tags",
            ViewKind::Confidence => "confidence",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| MessageError::Unsupported(s.to_string()))
    }
}

/// The recognized `type` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    LoadData,
    /// `set-<view>-port`: establishes the dedicated channel of one view
    SetPort(ViewKind),
    SetFilter,
    ClearFilter,
    /// User hover/selection inside a view
    Brush,
    SetBrush,
    ClearBrush,
    SetData,
    SetMessage,
    ClearMessage,
    NotifyIsLoading,
    Search,
    ExportVisualizationState,
    ImportVisualizationState,
    GenerateReport,
    DescribeFilters,
    SetDisplayMode,
    SetTimelineMode,
    SetMapMode,
    SetShowOnlyActive,
    SetConfidenceAspect,
}

impl MessageType {
    pub fn as_str(&self) -> String {
        let s = match self {
            MessageType::SetPort(view) => return format!("set-{view}-port"),
            MessageType::LoadData => "load-data",
            MessageType::SetFilter => "set-filter",
            MessageType::ClearFilter => "clear-filter",
            MessageType::Brush => "brush",
            MessageType::SetBrush => "set-brush",
            MessageType::ClearBrush => "clear-brush",
            MessageType::SetData => "set-data",
            MessageType::SetMessage => "set-message",
            MessageType::ClearMessage => "clear-message",
            MessageType::NotifyIsLoading => "notify-is-loading",
            MessageType::Search => "search",
            MessageType::ExportVisualizationState => "export-visualization-state",
            MessageType::ImportVisualizationState => "import-visualization-state",
            MessageType::GenerateReport => "generate-report",
            MessageType::DescribeFilters => "describe-filters",
            MessageType::SetDisplayMode => "set-display-mode",
            MessageType::SetTimelineMode => "set-timeline-mode",
            MessageType::SetMapMode => "set-map-mode",
            MessageType::SetShowOnlyActive => "set-show-only-active",
            MessageType::SetConfidenceAspect => "set-confidence-aspect",
        };
        s.to_string()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "load-data" => MessageType::LoadData,
            "set-filter" => MessageType::SetFilter,
            "clear-filter" => MessageType::ClearFilter,
            "brush" => MessageType::Brush,
            "set-brush" => MessageType::SetBrush,
            "clear-brush" => MessageType::ClearBrush,
            "set-data" => MessageType::SetData,
            "set-message" => MessageType::SetMessage,
            "clear-message" => MessageType::ClearMessage,
            "notify-is-loading" => MessageType::NotifyIsLoading,
            "search" => MessageType::Search,
            "export-visualization-state" => MessageType::ExportVisualizationState,
            "import-visualization-state" => MessageType::ImportVisualizationState,
            "generate-report" => MessageType::GenerateReport,
            "describe-filters" => MessageType::DescribeFilters,
            "set-display-mode" => MessageType::SetDisplayMode,
            "set-timeline-mode" => MessageType::SetTimelineMode,
            "set-map-mode" => MessageType::SetMapMode,
            "set-show-only-active" => MessageType::SetShowOnlyActive,
            "set-confidence-aspect" => MessageType::SetConfidenceAspect,
            other => {
                let view = other
                    .strip_prefix("set-")
                    .and_then(|rest| rest.strip_suffix("-port"))
                    .ok_or_else(|| MessageError::Unsupported(other.to_string()))?;
                MessageType::SetPort(view.parse()?)
            }
        };
        Ok(kind)
    }
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `{ type, target?, source?, data }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    pub fn new<T: Serialize>(kind: MessageType, data: &T) -> Result<Self, MessageError> {
        let data = serde_json::to_value(data).map_err(|source| MessageError::Payload { kind, source })?;
        Ok(Self {
            kind,
            target: None,
            source: None,
            data,
        })
    }

    /// Envelope without payload
    pub fn signal(kind: MessageType) -> Self {
        Self {
            kind,
            target: None,
            source: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_source(mut self, view: ViewKind) -> Self {
        self.source = Some(view.to_string());
        self
    }

    pub fn with_target(mut self, view: ViewKind) -> Self {
        self.target = Some(view.to_string());
        self
    }

    /// Decode the payload into its typed form
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_value(self.data.clone()).map_err(|source| MessageError::Payload {
            kind: self.kind,
            source,
        })
    }

    /// Parse a wire message, checking the `type` tag first
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let raw: RawEnvelope = serde_json::from_str(text)?;
        Ok(Self {
            kind: raw.kind.parse()?,
            target: raw.target,
            source: raw.source,
            data: raw.data,
        })
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The view this message is addressed to, if any
    pub fn target_view(&self) -> Option<ViewKind> {
        self.target.as_deref().and_then(|t| t.parse().ok())
    }
}
