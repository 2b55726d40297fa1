//! Untimed distribution: tuples without a time span, grouped by main
//! religion and bucket key

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use damast_core::{IdSet, PlaceId, ReligionId, SourceId, TupleId, ViewSettings};
use damast_data::model::Tuple;
use damast_data::AggregateSelection;

use super::{bucket_keys, key_rank, BucketKey};

/// Active or inactive half of one glyph, carrying the ids a click on it
/// brushes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntimedBin {
    pub count: usize,
    pub place_ids: IdSet<PlaceId>,
    pub religion_ids: IdSet<ReligionId>,
    pub source_ids: IdSet<SourceId>,
    pub tuple_ids: IdSet<TupleId>,
}

impl UntimedBin {
    fn add(&mut self, tuple: &Tuple) {
        self.count += 1;
        self.place_ids.insert(tuple.place_id);
        self.religion_ids.insert(tuple.religion_id);
        self.source_ids.extend(tuple.source_ids.iter().copied());
        self.tuple_ids.insert(tuple.tuple_id);
    }

    /// Brush selection for this bin
    pub fn selection(&self) -> AggregateSelection {
        AggregateSelection {
            place_ids: self.place_ids.clone(),
            religion_ids: self.religion_ids.clone(),
            source_ids: self.source_ids.clone(),
            tuple_ids: self.tuple_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntimedRow {
    pub key: String,
    pub bucket: BucketKey,
    pub active: UntimedBin,
    pub inactive: UntimedBin,
    /// Tuples in the rows before this one within the group
    pub offset: usize,
}

impl UntimedRow {
    pub fn total(&self) -> usize {
        self.active.count + self.inactive.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntimedGroup {
    pub main_religion_id: ReligionId,
    pub rows: Vec<UntimedRow>,
    pub total: usize,
}

/// Group untimed tuples by main religion, then by bucket key.
///
/// `main_religion` maps a religion to its top-level ancestor. Groups and
/// rows follow `religion_order` (rows in confidence mode follow the fixed
/// confidence ordering).
pub fn untimed_from_tuples(
    tuples: &[Tuple],
    main_religion: impl Fn(ReligionId) -> ReligionId,
    religion_order: &[ReligionId],
    settings: &ViewSettings,
) -> Vec<UntimedGroup> {
    let mut groups: BTreeMap<ReligionId, BTreeMap<BucketKey, (UntimedBin, UntimedBin)>> = BTreeMap::new();

    for tuple in tuples.iter().filter(|t| !t.is_timed()) {
        let group = groups.entry(main_religion(tuple.religion_id)).or_default();
        for key in bucket_keys(tuple, settings.display_mode, settings.confidence_aspect) {
            let (active, inactive) = group.entry(key).or_default();
            if tuple.active {
                active.add(tuple);
            } else {
                inactive.add(tuple);
            }
        }
    }

    let mut out: Vec<UntimedGroup> = groups
        .into_iter()
        .map(|(main_religion_id, bins)| {
            let mut bins: Vec<_> = bins.into_iter().collect();
            bins.sort_by_key(|(key, _)| key_rank(key, religion_order));

            let mut offset = 0;
            let rows: Vec<UntimedRow> = bins
                .into_iter()
                .map(|(bucket, (active, inactive))| {
                    let row = UntimedRow { key: bucket.key(), bucket, active, inactive, offset };
                    offset += row.total();
                    row
                })
                .collect();
            UntimedGroup { main_religion_id, rows, total: offset }
        })
        .collect();

    out.sort_by_key(|g| key_rank(&BucketKey::Religion(g.main_religion_id), religion_order));
    out
}
