//! Map glyphs: one per geolocated place, plus a summary of the rest

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use damast_core::{IdSet, MapMode, PlaceId};
use damast_data::model::GeoLocation;
use damast_data::{AggregateSelection, DatasetSnapshot};

use super::{bucket_keys, key_rank, BucketKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSegment {
    pub key: String,
    pub bucket: BucketKey,
    pub active: bool,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapGlyph {
    pub place_id: PlaceId,
    pub name: String,
    pub geoloc: GeoLocation,
    pub active: bool,
    pub brushed: bool,
    pub segments: Vec<MapSegment>,
    /// What a click on this glyph brushes
    pub selection: AggregateSelection,
}

/// Places the map cannot draw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedSummary {
    pub place_ids: IdSet<PlaceId>,
    pub active_tuples: usize,
    pub inactive_tuples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub mode: MapMode,
    pub glyphs: Vec<MapGlyph>,
    pub unplaced: UnplacedSummary,
}

/// Glyph per geolocated place with at least one tuple.
///
/// With `show_only_active` only active tuples contribute segments and
/// places without any are left out.
pub fn map_data(snapshot: &DatasetSnapshot, brushed: Option<&IdSet<PlaceId>>) -> MapData {
    let settings = snapshot.settings;
    let order = snapshot.religion_order();
    let mut glyphs = Vec::new();
    let mut unplaced = UnplacedSummary::default();

    for place in snapshot.places.values() {
        let tuples: Vec<_> = snapshot
            .index
            .tuple_ids_for_location_id(place.id)
            .iter()
            .filter_map(|id| snapshot.tuple(*id))
            .collect();

        let Some(geoloc) = place.geoloc else {
            unplaced.place_ids.insert(place.id);
            unplaced.active_tuples += tuples.iter().filter(|t| t.active).count();
            unplaced.inactive_tuples += tuples.iter().filter(|t| !t.active).count();
            continue;
        };

        let mut counts: BTreeMap<((usize, BucketKey), bool), usize> = BTreeMap::new();
        let mut selection = AggregateSelection::default();
        for tuple in tuples.iter().filter(|t| t.active || !settings.show_only_active) {
            for key in bucket_keys(tuple, settings.display_mode, settings.confidence_aspect) {
                *counts.entry((key_rank(&key, order), !tuple.active)).or_default() += 1;
            }
            selection.place_ids.insert(tuple.place_id);
            selection.religion_ids.insert(tuple.religion_id);
            selection.source_ids.extend(tuple.source_ids.iter().copied());
            selection.tuple_ids.insert(tuple.tuple_id);
        }
        if counts.is_empty() {
            continue;
        }

        glyphs.push(MapGlyph {
            place_id: place.id,
            name: place.name.clone(),
            geoloc,
            active: snapshot.active_places.contains(&place.id),
            brushed: brushed.is_some_and(|ids| ids.contains(&place.id)),
            segments: counts
                .into_iter()
                .map(|(((_, bucket), inactive), count)| MapSegment {
                    key: bucket.layer(!inactive),
                    bucket,
                    active: !inactive,
                    count,
                })
                .collect(),
            selection,
        });
    }

    MapData { mode: settings.map_mode, glyphs, unplaced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::raw;
    use damast_data::{Dataset, ReligionFilter};

    #[test]
    fn test_glyphs_and_unplaced() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([2])));

        let data = map_data(&dataset.snapshot(), Some(&IdSet::from([2])));
        assert_eq!(data.mode, MapMode::Clustered);
        assert_eq!(data.glyphs.len(), 2);

        let baghdad = &data.glyphs[0];
        let keys: Vec<_> = baghdad.segments.iter().map(|s| (s.key.as_str(), s.count)).collect();
        assert_eq!(keys, [("2a", 1), ("3i", 1)]);
        assert_eq!(baghdad.selection.tuple_ids, IdSet::from([1, 2]));
        assert!(!baghdad.brushed);
        assert!(data.glyphs[1].brushed);

        assert_eq!(data.unplaced.place_ids, IdSet::from([3]));
        assert_eq!((data.unplaced.active_tuples, data.unplaced.inactive_tuples), (0, 1));
    }

    #[test]
    fn test_show_only_active_skips_inactive_places() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([3])));
        dataset.set_show_only_active(true);

        let data = map_data(&dataset.snapshot(), None);
        let ids: Vec<_> = data.glyphs.iter().map(|g| g.place_id).collect();
        assert_eq!(ids, [1]);
        assert_eq!(data.glyphs[0].selection.tuple_ids, IdSet::from([2]));
    }
}
