//! Filter state and the per-dimension acceptance predicates

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use damast_core::{ConfidenceAspect, IdSet, PlaceId, ReligionId, SourceId, TagId};

use crate::model::{Confidence, GeoLocation, Tuple, TimeSpan};

/// Religion predicate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReligionFilter {
    /// `null`: every religion
    #[default]
    All,
    /// `[1, 2]`: tuple religion is one of these
    Simple(IdSet<ReligionId>),
    /// `[[1, 2], [3]]`: OR of AND groups. A tuple passes if some group
    /// contains its religion and its place has evidence of every religion
    /// in that group.
    Complex(Vec<IdSet<ReligionId>>),
}

impl ReligionFilter {
    pub fn religion_ids(&self) -> BTreeSet<ReligionId> {
        match self {
            ReligionFilter::All => BTreeSet::new(),
            ReligionFilter::Simple(ids) => ids.clone(),
            ReligionFilter::Complex(groups) => groups.iter().flatten().copied().collect(),
        }
    }
}

/// Allowed values of one confidence aspect; `None` is an explicit member.
pub type ConfidenceRange = BTreeSet<Option<Confidence>>;

/// The full six-value range
pub fn full_range() -> ConfidenceRange {
    Confidence::ORDER.into_iter().collect()
}

/// Per-aspect confidence selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceFilter {
    pub time: ConfidenceRange,
    pub religion: ConfidenceRange,
    pub location: ConfidenceRange,
    pub place_attribution: ConfidenceRange,
    pub sources: ConfidenceRange,
    pub interpretation: ConfidenceRange,
}

impl Default for ConfidenceFilter {
    fn default() -> Self {
        Self {
            time: full_range(),
            religion: full_range(),
            location: full_range(),
            place_attribution: full_range(),
            sources: full_range(),
            interpretation: full_range(),
        }
    }
}

impl ConfidenceFilter {
    pub fn range(&self, aspect: ConfidenceAspect) -> &ConfidenceRange {
        match aspect {
            ConfidenceAspect::Time => &self.time,
            ConfidenceAspect::Religion => &self.religion,
            ConfidenceAspect::Location => &self.location,
            ConfidenceAspect::PlaceAttribution => &self.place_attribution,
            ConfidenceAspect::Sources => &self.sources,
            ConfidenceAspect::Interpretation => &self.interpretation,
        }
    }

    pub fn range_mut(&mut self, aspect: ConfidenceAspect) -> &mut ConfidenceRange {
        match aspect {
            ConfidenceAspect::Time => &mut self.time,
            ConfidenceAspect::Religion => &mut self.religion,
            ConfidenceAspect::Location => &mut self.location,
            ConfidenceAspect::PlaceAttribution => &mut self.place_attribution,
            ConfidenceAspect::Sources => &mut self.sources,
            ConfidenceAspect::Interpretation => &mut self.interpretation,
        }
    }

    /// A tuple passes an aspect if any of its values for it is allowed
    pub fn accepts_aspect(&self, tuple: &Tuple, aspect: ConfidenceAspect) -> bool {
        let range = self.range(aspect);
        tuple.confidence.values(aspect).iter().any(|v| range.contains(v))
    }

    pub fn accepts(&self, tuple: &Tuple) -> bool {
        ConfidenceAspect::ALL
            .into_iter()
            .all(|aspect| self.accepts_aspect(tuple, aspect))
    }
}

/// Geographic bounding box used by the map filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn contains(&self, loc: &GeoLocation) -> bool {
        let lat_ok = self.south <= loc.lat && loc.lat <= self.north;
        // boxes crossing the antimeridian have west > east
        let lng_ok = if self.west <= self.east {
            self.west <= loc.lng && loc.lng <= self.east
        } else {
            loc.lng >= self.west || loc.lng <= self.east
        };
        lat_ok && lng_ok
    }
}

/// One filter dimension, used by `clear-filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterDimension {
    Religion,
    Location,
    Source,
    Tags,
    Time,
    Confidence,
}

/// Complete filter state; the serialized form of "visualization state".
///
/// Every dimension is required on import, even when it is `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub religion: ReligionFilter,
    #[serde(deserialize_with = "Option::deserialize")]
    pub location: Option<IdSet<PlaceId>>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub source: Option<IdSet<SourceId>>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub tags: Option<IdSet<TagId>>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub time: Option<TimeSpan>,
    pub confidence: ConfidenceFilter,
}

impl FilterState {
    pub fn accepts_time(&self, tuple: &Tuple) -> bool {
        match (&self.time, &tuple.time_span) {
            (Some(window), Some(span)) => span.overlaps(window),
            // untimed evidence has nothing to overlap with
            _ => true,
        }
    }

    pub fn accepts_place(&self, tuple: &Tuple) -> bool {
        self.location
            .as_ref()
            .map_or(true, |ids| ids.contains(&tuple.place_id))
    }

    pub fn accepts_source(&self, tuple: &Tuple) -> bool {
        self.source
            .as_ref()
            .map_or(true, |ids| tuple.source_ids.iter().any(|s| ids.contains(s)))
    }

    pub fn accepts_tags(&self, tuple_tags: &[TagId]) -> bool {
        self.tags
            .as_ref()
            .map_or(true, |ids| tuple_tags.iter().any(|t| ids.contains(t)))
    }

    /// Reset one dimension to its unrestricted value
    pub fn clear(&mut self, dimension: FilterDimension) {
        match dimension {
            FilterDimension::Religion => self.religion = ReligionFilter::All,
            FilterDimension::Location => self.location = None,
            FilterDimension::Source => self.source = None,
            FilterDimension::Tags => self.tags = None,
            FilterDimension::Time => self.time = None,
            FilterDimension::Confidence => self.confidence = ConfidenceFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TupleConfidence;

    fn tuple_with(conf: TupleConfidence) -> Tuple {
        Tuple {
            tuple_id: 1,
            place_id: 1,
            religion_id: 1,
            source_ids: vec![1, 2],
            time_span: Some(TimeSpan::new(800, 820)),
            confidence: conf,
            active: false,
        }
    }

    #[test]
    fn test_religion_filter_shapes() {
        let all: ReligionFilter = serde_json::from_str("null").unwrap();
        assert_eq!(all, ReligionFilter::All);
        let simple: ReligionFilter = serde_json::from_str("[3,1]").unwrap();
        assert_eq!(simple, ReligionFilter::Simple(IdSet::from([1, 3])));
        let complex: ReligionFilter = serde_json::from_str("[[1,2],[3]]").unwrap();
        assert_eq!(
            complex,
            ReligionFilter::Complex(vec![IdSet::from([1, 2]), IdSet::from([3])])
        );
        assert_eq!(complex.religion_ids(), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_null_is_an_independent_member() {
        let tuple = tuple_with(TupleConfidence::default());
        let mut filter = ConfidenceFilter::default();
        assert!(filter.accepts(&tuple));

        filter.interpretation.remove(&None);
        assert!(!filter.accepts(&tuple));

        filter.interpretation = BTreeSet::from([None]);
        assert!(filter.accepts(&tuple));
    }

    #[test]
    fn test_multi_valued_source_confidence() {
        let tuple = tuple_with(TupleConfidence {
            sources: vec![Some(Confidence::Certain), Some(Confidence::False)],
            ..TupleConfidence::default()
        });
        let mut filter = ConfidenceFilter::default();
        filter.sources = BTreeSet::from([Some(Confidence::False)]);
        assert!(filter.accepts_aspect(&tuple, ConfidenceAspect::Sources));
        filter.sources = BTreeSet::from([Some(Confidence::Probable), None]);
        assert!(!filter.accepts_aspect(&tuple, ConfidenceAspect::Sources));
    }

    #[test]
    fn test_missing_dimension_fails_to_decode() {
        let json = serde_json::to_value(FilterState::default()).unwrap();
        let mut obj = json.as_object().unwrap().clone();
        obj.remove("tags");
        let err = serde_json::from_value::<FilterState>(serde_json::Value::Object(obj));
        assert!(err.is_err());

        let ok = serde_json::from_value::<FilterState>(json).unwrap();
        assert_eq!(ok, FilterState::default());
    }

    #[test]
    fn test_antimeridian_bounds() {
        let bounds = GeoBounds { north: 10.0, south: -10.0, east: -170.0, west: 170.0 };
        assert!(bounds.contains(&GeoLocation { lat: 0.0, lng: 175.0 }));
        assert!(bounds.contains(&GeoLocation { lat: 0.0, lng: -175.0 }));
        assert!(!bounds.contains(&GeoLocation { lat: 0.0, lng: 0.0 }));
    }

    #[test]
    fn test_time_filter_ignores_untimed() {
        let mut state = FilterState::default();
        state.time = Some(TimeSpan::new(900, 1000));
        let mut tuple = tuple_with(TupleConfidence::default());
        assert!(!state.accepts_time(&tuple));
        tuple.time_span = None;
        assert!(state.accepts_time(&tuple));
    }
}
