//! Cross-view brushing
//!
//! A selection made in one view is resolved through the dataset indices
//! into the induced selection of every entity type, then handed to all seven
//! link slots in a single round. Every round gets a fresh sequence number so
//! views can drop updates from superseded rounds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use damast_core::sync::RoundCounter;
use damast_core::{BrushFanout, BrushLinks, BrushRound, IdSet, PlaceId, ReligionId, SourceId, TagId, TupleId};

use crate::model::TimeSpan;
use crate::Dataset;

/// Aggregate ids behind a glyph: a map cluster or an untimed bin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSelection {
    #[serde(default)]
    pub place_ids: IdSet<PlaceId>,
    #[serde(default)]
    pub religion_ids: IdSet<ReligionId>,
    #[serde(default)]
    pub source_ids: IdSet<SourceId>,
    #[serde(default)]
    pub tuple_ids: IdSet<TupleId>,
}

/// Where a brushing event originated, with the origin-specific selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "selection", rename_all = "kebab-case")]
pub enum BrushOrigin {
    Map(AggregateSelection),
    Untimed(AggregateSelection),
    Hierarchy(IdSet<ReligionId>),
    LocationList(PlaceId),
    Sources(SourceId),
    Tags(TagId),
    Timeline(TimeSpan),
}

#[derive(Default)]
struct Related {
    places: IdSet<PlaceId>,
    religions: IdSet<ReligionId>,
    sources: IdSet<SourceId>,
}

fn related(dataset: &Dataset, tuple_ids: &IdSet<TupleId>) -> Related {
    let mut out = Related::default();
    for tuple in tuple_ids.iter().filter_map(|id| dataset.tuple(*id)) {
        out.places.insert(tuple.place_id);
        out.religions.insert(tuple.religion_id);
        out.sources.extend(tuple.source_ids.iter().copied());
    }
    out
}

/// Union of the tags of the given tuples; identical for every origin
fn tags_for(dataset: &Dataset, tuple_ids: &IdSet<TupleId>) -> IdSet<TagId> {
    tuple_ids
        .iter()
        .flat_map(|id| dataset.index().tag_ids_for_tuple_id(*id))
        .copied()
        .collect()
}

/// Timed tuples go to the timeline, untimed ones to the untimed view
fn split_timed(dataset: &Dataset, tuple_ids: &IdSet<TupleId>) -> (IdSet<TupleId>, IdSet<TupleId>) {
    let mut timed = IdSet::new();
    let mut untimed = IdSet::new();
    for tuple in tuple_ids.iter().filter_map(|id| dataset.tuple(*id)) {
        if tuple.is_timed() {
            timed.insert(tuple.tuple_id);
        } else {
            untimed.insert(tuple.tuple_id);
        }
    }
    (timed, untimed)
}

fn fanout(
    dataset: &Dataset,
    places: IdSet<PlaceId>,
    religions: IdSet<ReligionId>,
    sources: IdSet<SourceId>,
    tuple_ids: &IdSet<TupleId>,
) -> BrushFanout {
    let (timed, untimed) = split_timed(dataset, tuple_ids);
    BrushFanout {
        location_list: Some(places.clone()),
        map: Some(places),
        untimed: Some(untimed),
        timeline: Some(timed),
        hierarchy: Some(religions),
        sources: Some(sources),
        tags: Some(tags_for(dataset, tuple_ids)),
    }
}

/// Resolve an origin selection into every view's induced selection
pub fn resolve(dataset: &Dataset, origin: &BrushOrigin) -> BrushFanout {
    match origin {
        BrushOrigin::Map(sel) | BrushOrigin::Untimed(sel) => fanout(
            dataset,
            sel.place_ids.clone(),
            sel.religion_ids.clone(),
            sel.source_ids.clone(),
            &sel.tuple_ids,
        ),
        BrushOrigin::Hierarchy(religion_ids) => {
            let tuple_ids = dataset.tuple_ids_for_religion_ids(religion_ids);
            let places = religion_ids
                .iter()
                .filter_map(|id| dataset.index().location_ids_for_religion_id(*id))
                .flatten()
                .copied()
                .collect();
            let sources = related(dataset, &tuple_ids).sources;
            fanout(dataset, places, religion_ids.clone(), sources, &tuple_ids)
        }
        BrushOrigin::LocationList(place_id) => {
            let tuple_ids = dataset.tuple_ids_for_location_ids(&IdSet::from([*place_id]));
            let rel = related(dataset, &tuple_ids);
            fanout(dataset, IdSet::from([*place_id]), rel.religions, rel.sources, &tuple_ids)
        }
        BrushOrigin::Sources(source_id) => {
            let tuple_ids = dataset.tuple_ids_for_source_id(*source_id);
            let rel = related(dataset, &tuple_ids);
            fanout(dataset, rel.places, rel.religions, IdSet::from([*source_id]), &tuple_ids)
        }
        BrushOrigin::Tags(tag_id) => {
            let tuple_ids = dataset.tuple_ids_for_tag_id(*tag_id);
            let rel = related(dataset, &tuple_ids);
            let sources = dataset
                .index()
                .source_ids_for_tag_id(*tag_id)
                .cloned()
                .unwrap_or_default();
            fanout(dataset, rel.places, rel.religions, sources, &tuple_ids)
        }
        BrushOrigin::Timeline(window) => {
            let tuple_ids: IdSet<TupleId> = dataset
                .tuples()
                .iter()
                .filter(|t| t.time_span.map_or(false, |s| s.overlaps(window)))
                .map(|t| t.tuple_id)
                .collect();
            let rel = related(dataset, &tuple_ids);
            fanout(dataset, rel.places, rel.religions, rel.sources, &tuple_ids)
        }
    }
}

/// Cross-view highlight coordinator
#[derive(Default)]
pub struct Brush {
    links: BrushLinks,
    rounds: RoundCounter,
}

impl Brush {
    pub fn new(links: BrushLinks) -> Self {
        Self {
            links,
            rounds: RoundCounter::new(),
        }
    }

    pub fn set_links(&mut self, links: BrushLinks) {
        self.links = links;
    }

    async fn fire(&self, fanout: BrushFanout) -> BrushRound {
        let round = self.rounds.next();
        debug!(round, cleared = (fanout == BrushFanout::cleared()), "brush round issued");
        self.links.dispatch(round, fanout).await;
        round
    }

    /// Brush from any origin. Resolves once every link settled.
    pub async fn brush(&self, dataset: &Dataset, origin: &BrushOrigin) -> BrushRound {
        let fanout = resolve(dataset, origin);
        self.fire(fanout).await
    }

    pub async fn on_map_brush(&self, dataset: &Dataset, selection: AggregateSelection) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Map(selection)).await
    }

    pub async fn on_untimed_brush(&self, dataset: &Dataset, selection: AggregateSelection) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Untimed(selection)).await
    }

    pub async fn on_hierarchy_brush(&self, dataset: &Dataset, religion_ids: IdSet<ReligionId>) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Hierarchy(religion_ids)).await
    }

    pub async fn on_location_list_brush(&self, dataset: &Dataset, place_id: PlaceId) -> BrushRound {
        self.brush(dataset, &BrushOrigin::LocationList(place_id)).await
    }

    pub async fn on_source_brush(&self, dataset: &Dataset, source_id: SourceId) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Sources(source_id)).await
    }

    pub async fn on_tags_brush(&self, dataset: &Dataset, tag_id: TagId) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Tags(tag_id)).await
    }

    pub async fn on_timeline_brush(&self, dataset: &Dataset, window: TimeSpan) -> BrushRound {
        self.brush(dataset, &BrushOrigin::Timeline(window)).await
    }

    /// Every link receives `None`
    pub async fn reset_brush(&self) -> BrushRound {
        self.fire(BrushFanout::cleared()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample;
    use crate::model::{Location, Religion, Source, Tuple, TupleConfidence};
    use crate::RawDataset;
    use async_trait::async_trait;
    use damast_core::{BrushLink, BrushUpdate};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Last<T> {
        updates: Mutex<Vec<BrushUpdate<T>>>,
    }

    impl<T: Clone> Last<T> {
        fn last(&self) -> Option<BrushUpdate<T>> {
            self.updates.lock().last().cloned()
        }
    }

    #[async_trait]
    impl<T: Send + Sync + 'static> BrushLink<T> for Last<T> {
        async fn link(&self, update: BrushUpdate<T>) -> anyhow::Result<()> {
            self.updates.lock().push(update);
            Ok(())
        }
    }

    struct Recorders {
        location_list: Arc<Last<IdSet<PlaceId>>>,
        map: Arc<Last<IdSet<PlaceId>>>,
        untimed: Arc<Last<IdSet<TupleId>>>,
        timeline: Arc<Last<IdSet<TupleId>>>,
        hierarchy: Arc<Last<IdSet<ReligionId>>>,
        sources: Arc<Last<IdSet<SourceId>>>,
        tags: Arc<Last<IdSet<TagId>>>,
    }

    fn recording_brush() -> (Brush, Recorders) {
        let rec = Recorders {
            location_list: Arc::default(),
            map: Arc::default(),
            untimed: Arc::default(),
            timeline: Arc::default(),
            hierarchy: Arc::default(),
            sources: Arc::default(),
            tags: Arc::default(),
        };
        let links = BrushLinks {
            location_list: rec.location_list.clone(),
            map: rec.map.clone(),
            untimed: rec.untimed.clone(),
            timeline: rec.timeline.clone(),
            hierarchy: rec.hierarchy.clone(),
            sources: rec.sources.clone(),
            tags: rec.tags.clone(),
        };
        (Brush::new(links), rec)
    }

    #[tokio::test]
    async fn test_place_brush_splits_timed_and_untimed() {
        let raw = RawDataset {
            places: vec![Location {
                id: 9,
                name: "X".into(),
                geoloc: None,
                place_type: String::new(),
                confidence: None,
                alternative_names: Vec::new(),
            }],
            religions: vec![
                Religion { id: 1, name: "a".into(), parent_id: None, confidence: None },
                Religion { id: 2, name: "b".into(), parent_id: None, confidence: None },
            ],
            sources: vec![Source { id: 5, name: "s".into(), short_name: None }],
            tags: Vec::new(),
            tuples: vec![
                Tuple {
                    tuple_id: 100,
                    place_id: 9,
                    religion_id: 1,
                    source_ids: vec![5],
                    time_span: Some(TimeSpan::new(800, 820)),
                    confidence: TupleConfidence::default(),
                    active: false,
                },
                Tuple {
                    tuple_id: 200,
                    place_id: 9,
                    religion_id: 2,
                    source_ids: vec![5],
                    time_span: None,
                    confidence: TupleConfidence::default(),
                    active: false,
                },
            ],
        };
        let mut dataset = Dataset::default();
        dataset.load(raw).unwrap();
        let (brush, rec) = recording_brush();

        let round = brush.on_location_list_brush(&dataset, 9).await;

        assert_eq!(rec.timeline.last().unwrap(), BrushUpdate { round, ids: Some(IdSet::from([100])) });
        assert_eq!(rec.untimed.last().unwrap().ids, Some(IdSet::from([200])));
        assert_eq!(rec.hierarchy.last().unwrap().ids, Some(IdSet::from([1, 2])));
        assert_eq!(rec.location_list.last().unwrap().ids, Some(IdSet::from([9])));
        assert_eq!(rec.map.last().unwrap().ids, Some(IdSet::from([9])));
        assert_eq!(rec.sources.last().unwrap().ids, Some(IdSet::from([5])));
        assert_eq!(rec.tags.last().unwrap().ids, Some(IdSet::new()));
    }

    #[tokio::test]
    async fn test_hierarchy_brush_reaches_places_and_sources() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let (brush, rec) = recording_brush();

        brush.on_hierarchy_brush(&dataset, IdSet::from([2])).await;
        assert_eq!(rec.map.last().unwrap().ids, Some(IdSet::from([1, 2])));
        assert_eq!(rec.sources.last().unwrap().ids, Some(IdSet::from([1, 2])));
        assert_eq!(rec.timeline.last().unwrap().ids, Some(IdSet::from([1, 3])));
        assert_eq!(rec.untimed.last().unwrap().ids, Some(IdSet::new()));
        assert_eq!(rec.tags.last().unwrap().ids, Some(IdSet::from([1])));
        assert_eq!(rec.hierarchy.last().unwrap().ids, Some(IdSet::from([2])));
    }

    #[tokio::test]
    async fn test_tag_and_source_brush() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let (brush, rec) = recording_brush();

        brush.on_tags_brush(&dataset, 1).await;
        assert_eq!(rec.timeline.last().unwrap().ids, Some(IdSet::from([3])));
        assert_eq!(rec.sources.last().unwrap().ids, Some(IdSet::from([1, 2])));
        assert_eq!(rec.tags.last().unwrap().ids, Some(IdSet::from([1])));

        brush.on_source_brush(&dataset, 2).await;
        assert_eq!(rec.map.last().unwrap().ids, Some(IdSet::from([1, 2, 3])));
        assert_eq!(rec.untimed.last().unwrap().ids, Some(IdSet::from([2])));
        assert_eq!(rec.hierarchy.last().unwrap().ids, Some(IdSet::from([2, 3])));
    }

    #[tokio::test]
    async fn test_map_brush_passes_cluster_aggregate() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let (brush, rec) = recording_brush();

        let cluster = AggregateSelection {
            place_ids: IdSet::from([1]),
            religion_ids: IdSet::from([2, 3]),
            source_ids: IdSet::from([1, 2]),
            tuple_ids: IdSet::from([1, 2]),
        };
        brush.on_map_brush(&dataset, cluster).await;
        assert_eq!(rec.timeline.last().unwrap().ids, Some(IdSet::from([1])));
        assert_eq!(rec.untimed.last().unwrap().ids, Some(IdSet::from([2])));
        assert_eq!(rec.hierarchy.last().unwrap().ids, Some(IdSet::from([2, 3])));
    }

    #[tokio::test]
    async fn test_timeline_brush_window() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let (brush, rec) = recording_brush();

        brush.on_timeline_brush(&dataset, TimeSpan::new(740, 810)).await;
        assert_eq!(rec.timeline.last().unwrap().ids, Some(IdSet::from([1, 4])));
        assert_eq!(rec.location_list.last().unwrap().ids, Some(IdSet::from([1, 3])));
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let (brush, rec) = recording_brush();

        brush.on_location_list_brush(&dataset, 1).await;
        let first = brush.reset_brush().await;
        let second = brush.reset_brush().await;
        assert!(second > first);

        assert!(rec.location_list.last().unwrap().is_clear());
        assert!(rec.map.last().unwrap().is_clear());
        assert!(rec.untimed.last().unwrap().is_clear());
        assert!(rec.timeline.last().unwrap().is_clear());
        assert!(rec.hierarchy.last().unwrap().is_clear());
        assert!(rec.sources.last().unwrap().is_clear());
        assert!(rec.tags.last().unwrap().is_clear());
        assert_eq!(rec.tags.updates.lock().len(), 3);
    }

    #[test]
    fn test_origin_wire_shape() {
        let origin: BrushOrigin =
            serde_json::from_str(r#"{"origin":"location-list","selection":4}"#).unwrap();
        assert_eq!(origin, BrushOrigin::LocationList(4));
        let origin: BrushOrigin =
            serde_json::from_str(r#"{"origin":"hierarchy","selection":[1,2]}"#).unwrap();
        assert_eq!(origin, BrushOrigin::Hierarchy(IdSet::from([1, 2])));
    }
}
