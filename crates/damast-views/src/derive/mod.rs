//! Pure derive algorithms turning tuples into render-ready aggregates
//!
//! Nothing in here touches a channel or a live dataset; every function takes
//! plain slices and settings so the views can recompute them in isolation.

pub mod confidence;
pub mod hierarchy;
pub mod locations;
pub mod map;
pub mod sources;
pub mod tags;
pub mod timeline;
pub mod untimed;

use serde::{Deserialize, Serialize};

use damast_core::{ConfidenceAspect, DisplayMode, ReligionId};
use damast_data::model::{Confidence, Tuple};

/// What a tuple is bucketed by in the stacked views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum BucketKey {
    Religion(ReligionId),
    Confidence(Option<Confidence>),
}

impl BucketKey {
    /// Stable string form used in layer names: the religion id or the
    /// confidence value (`"null"` for unknown)
    pub fn key(&self) -> String {
        match self {
            BucketKey::Religion(id) => id.to_string(),
            BucketKey::Confidence(value) => Confidence::key(*value).to_string(),
        }
    }

    /// Layer name of the active or inactive half of this bucket
    pub fn layer(&self, active: bool) -> String {
        format!("{}{}", self.key(), if active { 'a' } else { 'i' })
    }
}

/// Buckets a tuple falls into. Multi-valued aspects yield one per element.
pub fn bucket_keys(tuple: &Tuple, mode: DisplayMode, aspect: ConfidenceAspect) -> Vec<BucketKey> {
    match mode {
        DisplayMode::Religion => vec![BucketKey::Religion(tuple.religion_id)],
        DisplayMode::Confidence => tuple
            .confidence
            .values(aspect)
            .iter()
            .map(|value| BucketKey::Confidence(*value))
            .collect(),
    }
}

/// Every key of a display mode in display order.
///
/// Religion mode follows `religion_order`; confidence mode the fixed
/// confidence ordering.
pub fn ordered_keys(mode: DisplayMode, religion_order: &[ReligionId]) -> Vec<BucketKey> {
    match mode {
        DisplayMode::Religion => religion_order.iter().map(|id| BucketKey::Religion(*id)).collect(),
        DisplayMode::Confidence => Confidence::ORDER.into_iter().map(BucketKey::Confidence).collect(),
    }
}

/// Sort position of a key; keys missing from the ordering go last by value
pub fn key_rank(key: &BucketKey, religion_order: &[ReligionId]) -> (usize, BucketKey) {
    let pos = match key {
        BucketKey::Religion(id) => religion_order.iter().position(|r| r == id).unwrap_or(usize::MAX),
        BucketKey::Confidence(value) => Confidence::rank(*value),
    };
    (pos, *key)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use damast_data::model::{GeoLocation, Location, RawDataset, Religion, Source, Tag, TimeSpan, Tuple, TupleConfidence};

    pub(crate) fn tuple(
        id: u32,
        place: u32,
        religion: u32,
        sources: &[u32],
        span: Option<(i32, i32)>,
        active: bool,
    ) -> Tuple {
        Tuple {
            tuple_id: id,
            place_id: place,
            religion_id: religion,
            source_ids: sources.to_vec(),
            time_span: span.map(|(a, b)| TimeSpan::new(a, b)),
            confidence: TupleConfidence::default(),
            active,
        }
    }

    /// Three religions (2 under 1), three places (3 unplaced), two sources
    pub(crate) fn raw() -> RawDataset {
        let place = |id: u32, name: &str, geo: Option<(f64, f64)>, alt: &[&str]| Location {
            id,
            name: name.to_string(),
            geoloc: geo.map(|(lat, lng)| GeoLocation { lat, lng }),
            place_type: "city".to_string(),
            confidence: None,
            alternative_names: alt.iter().map(|s| s.to_string()).collect(),
        };
        let religion = |id: u32, name: &str, parent: Option<u32>| Religion {
            id,
            name: name.to_string(),
            parent_id: parent,
            confidence: None,
        };
        let mut tuples = vec![
            tuple(1, 1, 2, &[1], Some((800, 820)), true),
            tuple(2, 1, 3, &[2], None, true),
            tuple(3, 2, 2, &[1, 2], Some((900, 950)), true),
            tuple(4, 3, 3, &[2], Some((700, 750)), true),
        ];
        tuples[0].confidence.interpretation = Some(damast_data::model::Confidence::Certain);
        tuples[2].confidence.interpretation = Some(damast_data::model::Confidence::Probable);
        RawDataset {
            places: vec![
                place(1, "Baghdad", Some((33.3, 44.4)), &["Madinat al-Salam"]),
                place(2, "Mosul", Some((36.3, 43.1)), &["Nineveh"]),
                place(3, "Unplaced", None, &[]),
            ],
            religions: vec![
                religion(1, "Christianity", None),
                religion(2, "Church of the East", Some(1)),
                religion(3, "Judaism", None),
            ],
            sources: vec![
                Source { id: 1, name: "Chronicle".into(), short_name: Some("Chr".into()) },
                Source { id: 2, name: "Letters".into(), short_name: None },
            ],
            tags: vec![Tag { id: 1, name: "Bishopric".into(), tuple_ids: vec![3] }],
            tuples,
        }
    }
}
