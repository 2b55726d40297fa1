//! Entity records as delivered by the data endpoint

use serde::{Deserialize, Serialize};

use damast_core::{ConfidenceAspect, PlaceId, ReligionId, SourceId, TagId, TupleId};

/// Certainty of one aspect of a piece of evidence. `None` is "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Certain,
    Probable,
    Contested,
    Uncertain,
    False,
}

impl Confidence {
    /// Fixed display ordering, unknown last
    pub const ORDER: [Option<Confidence>; 6] = [
        Some(Confidence::Certain),
        Some(Confidence::Probable),
        Some(Confidence::Contested),
        Some(Confidence::Uncertain),
        Some(Confidence::False),
        None,
    ];

    /// Position of a value in [`Confidence::ORDER`]
    pub fn rank(value: Option<Confidence>) -> usize {
        match value {
            Some(c) => c as usize,
            None => 5,
        }
    }

    /// Stable string key, `"null"` for unknown
    pub fn key(value: Option<Confidence>) -> &'static str {
        match value {
            Some(Confidence::Certain) => "certain",
            Some(Confidence::Probable) => "probable",
            Some(Confidence::Contested) => "contested",
            Some(Confidence::Uncertain) => "uncertain",
            Some(Confidence::False) => "false",
            None => "null",
        }
    }
}

/// Inclusive year span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: i32,
    pub end: i32,
}

impl TimeSpan {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn covers(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Inclusive overlap test
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
}

/// A place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: PlaceId,
    pub name: String,
    /// `None` for unplaced locations
    #[serde(default)]
    pub geoloc: Option<GeoLocation>,
    #[serde(default)]
    pub place_type: String,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub alternative_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Religion {
    pub id: ReligionId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ReligionId>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

/// Evidence annotation, owning the tuples it applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub tuple_ids: Vec<TupleId>,
}

/// The six confidence fields of a tuple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TupleConfidence {
    pub time: Option<Confidence>,
    pub religion: Option<Confidence>,
    pub location: Option<Confidence>,
    pub place_attribution: Option<Confidence>,
    pub sources: Vec<Option<Confidence>>,
    pub interpretation: Option<Confidence>,
}

const UNKNOWN: &[Option<Confidence>] = &[None];

impl TupleConfidence {
    /// Values for one aspect. Single-valued aspects yield one element; an
    /// empty source list counts as one unknown value.
    pub fn values(&self, aspect: ConfidenceAspect) -> &[Option<Confidence>] {
        match aspect {
            ConfidenceAspect::Time => std::slice::from_ref(&self.time),
            ConfidenceAspect::Religion => std::slice::from_ref(&self.religion),
            ConfidenceAspect::Location => std::slice::from_ref(&self.location),
            ConfidenceAspect::PlaceAttribution => std::slice::from_ref(&self.place_attribution),
            ConfidenceAspect::Interpretation => std::slice::from_ref(&self.interpretation),
            ConfidenceAspect::Sources if self.sources.is_empty() => UNKNOWN,
            ConfidenceAspect::Sources => &self.sources,
        }
    }
}

/// Evidence of a religion at a place, attested by sources, optionally dated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub tuple_id: TupleId,
    pub place_id: PlaceId,
    pub religion_id: ReligionId,
    #[serde(default)]
    pub source_ids: Vec<SourceId>,
    /// `None` for untimed evidence
    #[serde(default)]
    pub time_span: Option<TimeSpan>,
    #[serde(default)]
    pub confidence: TupleConfidence,
    /// Derived from the current filters; never read from input
    #[serde(skip_deserializing, default)]
    pub active: bool,
}

impl Tuple {
    pub fn is_timed(&self) -> bool {
        self.time_span.is_some()
    }
}

/// The full entity graph as returned by the data endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default)]
    pub places: Vec<Location>,
    #[serde(default)]
    pub religions: Vec<Religion>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub tuples: Vec<Tuple>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_rank_follows_display_order() {
        for (i, value) in Confidence::ORDER.iter().enumerate() {
            assert_eq!(Confidence::rank(*value), i);
        }
        assert_eq!(Confidence::key(None), "null");
    }

    #[test]
    fn test_source_confidence_values() {
        let mut conf = TupleConfidence::default();
        assert_eq!(conf.values(ConfidenceAspect::Sources), &[None]);
        conf.sources = vec![Some(Confidence::Certain), None];
        assert_eq!(conf.values(ConfidenceAspect::Sources).len(), 2);
        conf.time = Some(Confidence::False);
        assert_eq!(conf.values(ConfidenceAspect::Time), &[Some(Confidence::False)]);
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let span = TimeSpan::new(800, 820);
        assert!(span.overlaps(&TimeSpan::new(820, 900)));
        assert!(span.overlaps(&TimeSpan::new(700, 800)));
        assert!(!span.overlaps(&TimeSpan::new(821, 900)));
        assert!(span.covers(810));
    }

    #[test]
    fn test_tuple_active_is_not_read_from_input() {
        let tuple: Tuple = serde_json::from_str(
            r#"{"tuple_id":1,"place_id":2,"religion_id":3,"active":true,
                "confidence":{"interpretation":"probable"}}"#,
        )
        .unwrap();
        assert!(!tuple.active);
        assert!(!tuple.is_timed());
        assert_eq!(tuple.confidence.interpretation, Some(Confidence::Probable));
    }
}
