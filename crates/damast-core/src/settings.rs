//! View settings shared by the coordinator and every view unit

use serde::{Deserialize, Serialize};

/// Whether aggregation buckets by religion identity or by confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Religion,
    Confidence,
}

/// Timeline stacking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineMode {
    /// Raw magnitudes
    #[default]
    Quantitative,
    /// Presence-normalized unit bands
    Qualitative,
}

/// How the map groups its glyphs. Only forwarded to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapMode {
    #[default]
    Clustered,
    Cluttered,
}

/// One of the six independently filterable certainty dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAspect {
    Time,
    Religion,
    Location,
    PlaceAttribution,
    /// Multi-valued: one confidence per source
    Sources,
    #[default]
    Interpretation,
}

impl ConfidenceAspect {
    pub const ALL: [ConfidenceAspect; 6] = [
        ConfidenceAspect::Time,
        ConfidenceAspect::Religion,
        ConfidenceAspect::Location,
        ConfidenceAspect::PlaceAttribution,
        ConfidenceAspect::Sources,
        ConfidenceAspect::Interpretation,
    ];

    pub fn is_multi_valued(self) -> bool {
        self == ConfidenceAspect::Sources
    }
}

/// Runtime settings every view unit reads alongside the dataset snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSettings {
    pub display_mode: DisplayMode,
    pub timeline_mode: TimelineMode,
    pub map_mode: MapMode,
    pub confidence_aspect: ConfidenceAspect,
    /// Count only active tuples as "present" when highlighting
    pub show_only_active: bool,
}
