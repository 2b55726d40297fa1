//! Immutable dataset projection shared with the view units

use std::sync::Arc;

use indexmap::IndexMap;

use damast_core::{IdSet, PlaceId, ReligionId, SourceId, TagId, TupleId, ViewSettings};

use crate::filter::FilterState;
use crate::index::DatasetIndex;
use crate::model::{Location, Religion, Source, Tag, Tuple};

/// A read-only copy of the dataset at one generation.
///
/// Collections are reference counted, so a snapshot is cheap to take and
/// to send; a later mutation of the live dataset never shows through.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub generation: u64,
    pub places: Arc<IndexMap<PlaceId, Location>>,
    pub religions: Arc<IndexMap<ReligionId, Religion>>,
    pub sources: Arc<IndexMap<SourceId, Source>>,
    pub tags: Arc<IndexMap<TagId, Tag>>,
    pub tuples: Arc<Vec<Tuple>>,
    pub index: Arc<DatasetIndex>,
    pub active_places: IdSet<PlaceId>,
    pub filters: FilterState,
    pub settings: ViewSettings,
}

impl DatasetSnapshot {
    pub fn tuple(&self, id: TupleId) -> Option<&Tuple> {
        self.index.tuple_position(id).map(|pos| &self.tuples[pos])
    }

    pub fn main_religion(&self, id: ReligionId) -> ReligionId {
        self.index.main_religion(id).unwrap_or(id)
    }

    pub fn religion_order(&self) -> &[ReligionId] {
        self.index.religion_order()
    }

    /// Year range of timed evidence, `(0, 0)` when there is none
    pub fn year_range(&self) -> (i32, i32) {
        self.index.year_range().unwrap_or((0, 0))
    }

    /// Religions still allowed by the religion filter
    pub fn religion_enabled(&self, id: ReligionId) -> bool {
        use crate::filter::ReligionFilter;
        match &self.filters.religion {
            ReligionFilter::All => true,
            ReligionFilter::Simple(ids) => ids.contains(&id),
            ReligionFilter::Complex(groups) => groups.iter().any(|g| g.contains(&id)),
        }
    }
}
