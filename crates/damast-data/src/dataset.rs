//! The canonical dataset: entities, filters, derived indices
//!
//! Every filter setter recomputes the `active` flag of all tuples and
//! reports the touched [`ChangeScope`]s. Notifications are published on the
//! dataset's [`EventBus`] as [`DatasetChanged`]; between
//! [`Dataset::suspend_events`] and the matching [`Dataset::resume_events`]
//! they are merged into a single notification.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use damast_core::events::events::DatasetChanged;
use damast_core::{
    ChangeScope, ConfidenceAspect, DisplayMode, EventBus, IdSet, MapMode, PlaceId, ReligionId,
    ScopeSet, SourceId, TagId, TimelineMode, TupleId, ViewSettings,
};

use crate::filter::{ConfidenceFilter, ConfidenceRange, FilterDimension, FilterState, GeoBounds, ReligionFilter};
use crate::index::{DatasetIndex, HierarchyNode};
use crate::model::{Confidence, GeoLocation, Location, RawDataset, Religion, Source, Tag, TimeSpan, Tuple};
use crate::snapshot::DatasetSnapshot;
use crate::DataError;

/// Per-place summary for the map and location list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceData {
    pub place_id: PlaceId,
    pub name: String,
    pub place_type: String,
    pub geoloc: Option<GeoLocation>,
    pub active: bool,
    pub active_tuples: usize,
    pub inactive_tuples: usize,
    pub religion_ids: IdSet<ReligionId>,
}

/// Active/inactive tuple count for one confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceCount {
    pub value: Option<Confidence>,
    pub active: usize,
    pub inactive: usize,
}

/// Per aspect, active/inactive tuple counts for every confidence value in
/// display order. Multi-valued aspects count once per value.
pub fn confidence_counts(tuples: &[Tuple]) -> BTreeMap<ConfidenceAspect, Vec<ConfidenceCount>> {
    ConfidenceAspect::ALL
        .into_iter()
        .map(|aspect| {
            let mut counts: Vec<ConfidenceCount> = Confidence::ORDER
                .into_iter()
                .map(|value| ConfidenceCount { value, active: 0, inactive: 0 })
                .collect();
            for tuple in tuples {
                for value in tuple.confidence.values(aspect) {
                    let slot = &mut counts[Confidence::rank(*value)];
                    if tuple.active {
                        slot.active += 1;
                    } else {
                        slot.inactive += 1;
                    }
                }
            }
            (aspect, counts)
        })
        .collect()
}

pub struct Dataset {
    places: Arc<IndexMap<PlaceId, Location>>,
    religions: Arc<IndexMap<ReligionId, Religion>>,
    sources: Arc<IndexMap<SourceId, Source>>,
    tags: Arc<IndexMap<TagId, Tag>>,
    tuples: Arc<Vec<Tuple>>,
    index: Arc<DatasetIndex>,
    filters: FilterState,
    settings: ViewSettings,
    active_places: IdSet<PlaceId>,
    generation: u64,
    events: Arc<EventBus>,
    suspended: usize,
    pending: ScopeSet,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }
}

fn keyed<T>(
    items: Vec<T>,
    kind: &'static str,
    id: impl Fn(&T) -> u32,
) -> Result<IndexMap<u32, T>, DataError> {
    let mut map = IndexMap::with_capacity(items.len());
    for item in items {
        let key = id(&item);
        if map.insert(key, item).is_some() {
            return Err(DataError::DuplicateId { kind, id: key });
        }
    }
    Ok(map)
}

impl Dataset {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            places: Arc::default(),
            religions: Arc::default(),
            sources: Arc::default(),
            tags: Arc::default(),
            tuples: Arc::default(),
            index: Arc::default(),
            filters: FilterState::default(),
            settings: ViewSettings::default(),
            active_places: IdSet::new(),
            generation: 0,
            events,
            suspended: 0,
            pending: ScopeSet::empty(),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Replace the whole dataset; filters reset to unrestricted
    pub fn load(&mut self, raw: RawDataset) -> Result<(), DataError> {
        self.load_with_state(raw, None)
    }

    /// Replace the whole dataset and replay a saved filter state.
    ///
    /// Events stay suspended until both are applied, so observers only ever
    /// see the fully initialized dataset. A rejected state leaves the new
    /// dataset loaded with unrestricted filters and is reported as
    /// [`DataError::Replay`].
    pub fn load_with_state(&mut self, raw: RawDataset, state: Option<FilterState>) -> Result<(), DataError> {
        let places = keyed(raw.places, "place", |p| p.id)?;
        let religions = keyed(raw.religions, "religion", |r| r.id)?;
        let sources = keyed(raw.sources, "source", |s| s.id)?;
        let tags = keyed(raw.tags, "tag", |t| t.id)?;

        let mut seen = AHashSet::with_capacity(raw.tuples.len());
        for tuple in &raw.tuples {
            if !seen.insert(tuple.tuple_id) {
                return Err(DataError::DuplicateId { kind: "tuple", id: tuple.tuple_id });
            }
            if !places.contains_key(&tuple.place_id) {
                return Err(DataError::UnknownId { kind: "place", id: tuple.place_id });
            }
            if !religions.contains_key(&tuple.religion_id) {
                return Err(DataError::UnknownId { kind: "religion", id: tuple.religion_id });
            }
            if let Some(id) = tuple.source_ids.iter().find(|id| !sources.contains_key(*id)) {
                return Err(DataError::UnknownId { kind: "source", id: *id });
            }
            if let Some(span) = tuple.time_span.filter(|span| !span.is_valid()) {
                return Err(DataError::InvalidState(format!(
                    "tuple {} ends in {} before it starts in {}",
                    tuple.tuple_id, span.end, span.start
                )));
            }
        }

        let religion_list: Vec<Religion> = religions.values().cloned().collect();
        let tag_list: Vec<Tag> = tags.values().cloned().collect();
        let index = DatasetIndex::build(&religion_list, &tag_list, &raw.tuples);

        self.suspend_events();
        self.places = Arc::new(places);
        self.religions = Arc::new(religions);
        self.sources = Arc::new(sources);
        self.tags = Arc::new(tags);
        self.tuples = Arc::new(raw.tuples);
        self.index = Arc::new(index);
        self.filters = FilterState::default();
        self.active_places.clear();
        self.recompute_active();
        self.mark(ScopeSet::All);

        info!(
            places = self.places.len(),
            religions = self.religions.len(),
            tuples = self.tuples.len(),
            "dataset loaded"
        );
        let replay = match state {
            Some(state) => self.set_state(state).map_err(|err| DataError::Replay(Box::new(err))),
            None => Ok(()),
        };
        self.resume_events();
        replay
    }

    // ---- event batching -------------------------------------------------

    pub fn suspend_events(&mut self) {
        self.suspended += 1;
    }

    pub fn resume_events(&mut self) {
        if self.suspended == 0 {
            warn!("resume_events without matching suspend_events");
            return;
        }
        self.suspended -= 1;
        if self.suspended == 0 {
            self.flush();
        }
    }

    fn mark(&mut self, scopes: ScopeSet) {
        if scopes.is_empty() {
            return;
        }
        self.generation += 1;
        self.pending.merge(scopes);
        if self.suspended == 0 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let scopes = std::mem::take(&mut self.pending);
        if scopes.is_empty() {
            return;
        }
        debug!(?scopes, generation = self.generation, "dataset changed");
        self.events.publish(DatasetChanged { scopes });
    }

    // ---- filters --------------------------------------------------------

    /// Recompute `active` on every tuple; returns whether the active place
    /// set changed.
    fn recompute_active(&mut self) -> bool {
        let filters = &self.filters;
        let index = &self.index;
        let tuples = Arc::make_mut(&mut self.tuples);

        let base: Vec<bool> = tuples
            .iter()
            .map(|t| {
                filters.accepts_time(t)
                    && filters.accepts_place(t)
                    && filters.accepts_source(t)
                    && filters.accepts_tags(index.tag_ids_for_tuple_id(t.tuple_id))
                    && filters.confidence.accepts(t)
            })
            .collect();

        match &filters.religion {
            ReligionFilter::All => {
                for (tuple, pass) in tuples.iter_mut().zip(&base) {
                    tuple.active = *pass;
                }
            }
            ReligionFilter::Simple(ids) => {
                for (tuple, pass) in tuples.iter_mut().zip(&base) {
                    tuple.active = *pass && ids.contains(&tuple.religion_id);
                }
            }
            ReligionFilter::Complex(groups) => {
                let mut present: AHashMap<PlaceId, AHashSet<ReligionId>> = AHashMap::new();
                for (tuple, pass) in tuples.iter().zip(&base) {
                    if *pass {
                        present.entry(tuple.place_id).or_default().insert(tuple.religion_id);
                    }
                }
                for (tuple, pass) in tuples.iter_mut().zip(&base) {
                    let at_place = present.get(&tuple.place_id);
                    tuple.active = *pass
                        && groups.iter().any(|group| {
                            group.contains(&tuple.religion_id)
                                && at_place.map_or(false, |p| group.iter().all(|r| p.contains(r)))
                        });
                }
            }
        }

        let active_places: IdSet<PlaceId> =
            tuples.iter().filter(|t| t.active).map(|t| t.place_id).collect();
        let changed = active_places != self.active_places;
        self.active_places = active_places;
        changed
    }

    fn refilter(&mut self, scope: ChangeScope) {
        let mut scopes = ScopeSet::of([scope]);
        if self.recompute_active() {
            scopes.insert(ChangeScope::PlaceSet);
        }
        self.mark(scopes);
    }

    pub fn set_religion_filter(&mut self, filter: ReligionFilter) {
        if self.filters.religion != filter {
            self.filters.religion = filter;
            self.refilter(ChangeScope::ReligionFilter);
        }
    }

    pub fn set_place_filter(&mut self, ids: Option<IdSet<PlaceId>>) {
        if self.filters.location != ids {
            self.filters.location = ids;
            self.refilter(ChangeScope::PlaceFilter);
        }
    }

    pub fn set_source_filter(&mut self, ids: Option<IdSet<SourceId>>) {
        if self.filters.source != ids {
            self.filters.source = ids;
            self.refilter(ChangeScope::SourceFilter);
        }
    }

    pub fn set_tags_filter(&mut self, ids: Option<IdSet<TagId>>) {
        if self.filters.tags != ids {
            self.filters.tags = ids;
            self.refilter(ChangeScope::TagFilter);
        }
    }

    pub fn set_time_filter(&mut self, window: Option<TimeSpan>) {
        if self.filters.time != window {
            self.filters.time = window;
            self.refilter(ChangeScope::TimeFilter);
        }
    }

    pub fn set_confidence_filter(&mut self, filter: ConfidenceFilter) {
        if self.filters.confidence != filter {
            self.filters.confidence = filter;
            self.refilter(ChangeScope::ConfidenceFilter);
        }
    }

    pub fn set_confidence_range(&mut self, aspect: ConfidenceAspect, range: ConfidenceRange) {
        let mut filter = self.filters.confidence.clone();
        *filter.range_mut(aspect) = range;
        self.set_confidence_filter(filter);
    }

    /// Restrict places to those inside `bounds`; unplaced locations drop out.
    pub fn set_map_filter(&mut self, bounds: Option<GeoBounds>) {
        let ids = bounds.map(|b| {
            self.places
                .values()
                .filter(|p| p.geoloc.as_ref().map_or(false, |g| b.contains(g)))
                .map(|p| p.id)
                .collect()
        });
        self.set_place_filter(ids);
    }

    /// Apply the checked nodes of the hierarchy view
    pub fn update_hierarchy_filters(&mut self, checked: IdSet<ReligionId>) {
        let filter = if self.religions.keys().all(|id| checked.contains(id)) {
            ReligionFilter::All
        } else {
            ReligionFilter::Simple(checked)
        };
        self.set_religion_filter(filter);
    }

    pub fn clear_filter(&mut self, dimension: FilterDimension) {
        let mut state = self.filters.clone();
        state.clear(dimension);
        self.apply_state(state);
    }

    // ---- view settings --------------------------------------------------

    pub fn settings(&self) -> ViewSettings {
        self.settings
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if self.settings.display_mode != mode {
            self.settings.display_mode = mode;
            self.mark(ScopeSet::of([ChangeScope::DisplayMode]));
        }
    }

    pub fn set_timeline_mode(&mut self, mode: TimelineMode) {
        if self.settings.timeline_mode != mode {
            self.settings.timeline_mode = mode;
            self.mark(ScopeSet::of([ChangeScope::TimelineMode]));
        }
    }

    pub fn set_map_mode(&mut self, mode: MapMode) {
        if self.settings.map_mode != mode {
            self.settings.map_mode = mode;
            self.mark(ScopeSet::of([ChangeScope::MapMode]));
        }
    }

    pub fn set_confidence_aspect(&mut self, aspect: ConfidenceAspect) {
        if self.settings.confidence_aspect != aspect {
            self.settings.confidence_aspect = aspect;
            self.mark(ScopeSet::of([ChangeScope::ConfidenceAspect]));
        }
    }

    pub fn set_show_only_active(&mut self, value: bool) {
        if self.settings.show_only_active != value {
            self.settings.show_only_active = value;
            self.mark(ScopeSet::of([ChangeScope::ShowOnlyActive]));
        }
    }

    // ---- state ----------------------------------------------------------

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn get_state(&self) -> FilterState {
        self.filters.clone()
    }

    /// Validate and apply a complete filter state as one change notification
    pub fn set_state(&mut self, state: FilterState) -> Result<(), DataError> {
        self.validate(&state)?;
        self.apply_state(state);
        Ok(())
    }

    fn apply_state(&mut self, state: FilterState) {
        self.suspend_events();
        let FilterState { religion, location, source, tags, time, confidence } = state;
        self.set_religion_filter(religion);
        self.set_place_filter(location);
        self.set_source_filter(source);
        self.set_tags_filter(tags);
        self.set_time_filter(time);
        self.set_confidence_filter(confidence);
        self.resume_events();
    }

    fn validate(&self, state: &FilterState) -> Result<(), DataError> {
        fn check(ids: Option<&IdSet<u32>>, known: impl Fn(&u32) -> bool, kind: &'static str) -> Result<(), DataError> {
            match ids.and_then(|ids| ids.iter().find(|id| !known(id))) {
                Some(id) => Err(DataError::UnknownId { kind, id: *id }),
                None => Ok(()),
            }
        }

        let religion_ids = state.religion.religion_ids();
        check(Some(&religion_ids), |id| self.religions.contains_key(id), "religion")?;
        check(state.location.as_ref(), |id| self.places.contains_key(id), "place")?;
        check(state.source.as_ref(), |id| self.sources.contains_key(id), "source")?;
        check(state.tags.as_ref(), |id| self.tags.contains_key(id), "tag")?;
        if let Some(window) = state.time {
            if !window.is_valid() {
                return Err(DataError::InvalidState(format!(
                    "time window starts after it ends ({} > {})",
                    window.start, window.end
                )));
            }
        }
        if let ReligionFilter::Complex(groups) = &state.religion {
            if groups.iter().any(|g| g.is_empty()) {
                return Err(DataError::InvalidState("empty religion group".to_string()));
            }
        }
        Ok(())
    }

    // ---- derived queries ------------------------------------------------

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn places(&self) -> &IndexMap<PlaceId, Location> {
        &self.places
    }

    pub fn religions(&self) -> &IndexMap<ReligionId, Religion> {
        &self.religions
    }

    pub fn sources(&self) -> &IndexMap<SourceId, Source> {
        &self.sources
    }

    pub fn tags(&self) -> &IndexMap<TagId, Tag> {
        &self.tags
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn tuple(&self, id: TupleId) -> Option<&Tuple> {
        self.index.tuple_position(id).map(|pos| &self.tuples[pos])
    }

    pub fn tuple_ids_for_religion_ids(&self, ids: &IdSet<ReligionId>) -> IdSet<TupleId> {
        ids.iter()
            .flat_map(|id| self.index.tuple_ids_for_religion_id(*id))
            .copied()
            .collect()
    }

    pub fn tuple_ids_for_location_ids(&self, ids: &IdSet<PlaceId>) -> IdSet<TupleId> {
        ids.iter()
            .flat_map(|id| self.index.tuple_ids_for_location_id(*id))
            .copied()
            .collect()
    }

    pub fn tuple_ids_for_source_id(&self, id: SourceId) -> IdSet<TupleId> {
        self.index.tuple_ids_for_source_id(id).iter().copied().collect()
    }

    pub fn tuple_ids_for_tag_id(&self, id: TagId) -> IdSet<TupleId> {
        self.index.tuple_ids_for_tag_id(id).iter().copied().collect()
    }

    /// Places with at least one active tuple
    pub fn active_places(&self) -> &IdSet<PlaceId> {
        &self.active_places
    }

    pub fn place_data(&self) -> Vec<PlaceData> {
        self.places
            .values()
            .map(|place| {
                let mut data = PlaceData {
                    place_id: place.id,
                    name: place.name.clone(),
                    place_type: place.place_type.clone(),
                    geoloc: place.geoloc,
                    active: self.active_places.contains(&place.id),
                    active_tuples: 0,
                    inactive_tuples: 0,
                    religion_ids: IdSet::new(),
                };
                for tuple_id in self.index.tuple_ids_for_location_id(place.id) {
                    if let Some(tuple) = self.tuple(*tuple_id) {
                        if tuple.active {
                            data.active_tuples += 1;
                        } else {
                            data.inactive_tuples += 1;
                        }
                        data.religion_ids.insert(tuple.religion_id);
                    }
                }
                data
            })
            .collect()
    }

    pub fn religion_ordering(&self) -> &[ReligionId] {
        self.index.religion_order()
    }

    pub fn min_year(&self) -> Option<i32> {
        self.index.year_range().map(|(lo, _)| lo)
    }

    pub fn max_year(&self) -> Option<i32> {
        self.index.year_range().map(|(_, hi)| hi)
    }

    pub fn hierarchy(&self) -> &[HierarchyNode] {
        self.index.hierarchy()
    }

    /// Per aspect, active/inactive counts for every confidence value
    pub fn confidence_data(&self) -> BTreeMap<ConfidenceAspect, Vec<ConfidenceCount>> {
        confidence_counts(&self.tuples)
    }

    /// Immutable projection handed to the view units
    pub fn snapshot(&self) -> Arc<DatasetSnapshot> {
        Arc::new(DatasetSnapshot {
            generation: self.generation,
            places: self.places.clone(),
            religions: self.religions.clone(),
            sources: self.sources.clone(),
            tags: self.tags.clone(),
            tuples: self.tuples.clone(),
            index: self.index.clone(),
            active_places: self.active_places.clone(),
            filters: self.filters.clone(),
            settings: self.settings,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::TupleConfidence;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;

    pub(crate) fn sample() -> RawDataset {
        let place = |id: u32, name: &str, geo: Option<(f64, f64)>| Location {
            id,
            name: name.to_string(),
            geoloc: geo.map(|(lat, lng)| GeoLocation { lat, lng }),
            place_type: "city".to_string(),
            confidence: None,
            alternative_names: Vec::new(),
        };
        let religion = |id: u32, name: &str, parent: Option<u32>| Religion {
            id,
            name: name.to_string(),
            parent_id: parent,
            confidence: None,
        };
        let tuple = |id: u32, place: u32, religion: u32, sources: Vec<u32>, span: Option<(i32, i32)>, interp: Option<Confidence>| Tuple {
            tuple_id: id,
            place_id: place,
            religion_id: religion,
            source_ids: sources,
            time_span: span.map(|(a, b)| TimeSpan::new(a, b)),
            confidence: TupleConfidence { interpretation: interp, ..TupleConfidence::default() },
            active: false,
        };

        RawDataset {
            places: vec![
                place(1, "Baghdad", Some((33.3, 44.4))),
                place(2, "Mosul", Some((36.3, 43.1))),
                place(3, "Unplaced", None),
            ],
            religions: vec![
                religion(1, "Christianity", None),
                religion(2, "Church of the East", Some(1)),
                religion(3, "Judaism", None),
            ],
            sources: vec![
                Source { id: 1, name: "Chronicle".into(), short_name: None },
                Source { id: 2, name: "Letters".into(), short_name: None },
            ],
            tags: vec![Tag { id: 1, name: "disputed".into(), tuple_ids: vec![3] }],
            tuples: vec![
                tuple(1, 1, 2, vec![1], Some((800, 820)), Some(Confidence::Certain)),
                tuple(2, 1, 3, vec![2], None, None),
                tuple(3, 2, 2, vec![1, 2], Some((900, 950)), Some(Confidence::Probable)),
                tuple(4, 3, 3, vec![2], Some((700, 750)), Some(Confidence::Contested)),
            ],
        }
    }

    fn recording(dataset: &Dataset) -> Arc<Mutex<Vec<ScopeSet>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        dataset
            .events()
            .on::<DatasetChanged, _>(move |e| sink.lock().push(e.scopes.clone()));
        seen
    }

    fn active_ids(dataset: &Dataset) -> BTreeSet<u32> {
        dataset.tuples().iter().filter(|t| t.active).map(|t| t.tuple_id).collect()
    }

    #[test]
    fn test_load_activates_everything_and_notifies_once() {
        let mut dataset = Dataset::default();
        let seen = recording(&dataset);
        dataset.load(sample()).unwrap();

        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(dataset.active_places(), &IdSet::from([1, 2, 3]));
        assert_eq!(seen.lock().as_slice(), &[ScopeSet::All]);
        assert_eq!(dataset.min_year(), Some(700));
        assert_eq!(dataset.max_year(), Some(950));
    }

    #[test]
    fn test_load_rejects_dangling_reference() {
        let mut raw = sample();
        raw.tuples[0].religion_id = 42;
        let err = Dataset::default().load(raw).unwrap_err();
        assert!(matches!(err, DataError::UnknownId { kind: "religion", id: 42 }));
    }

    #[test]
    fn test_suspended_mutations_collapse_into_one_notification() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let seen = recording(&dataset);

        dataset.suspend_events();
        dataset.set_time_filter(Some(TimeSpan::new(790, 830)));
        dataset.set_source_filter(Some(IdSet::from([1])));
        dataset.set_timeline_mode(TimelineMode::Qualitative);
        assert!(seen.lock().is_empty());
        dataset.resume_events();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains(ChangeScope::TimeFilter));
        assert!(seen[0].contains(ChangeScope::SourceFilter));
        assert!(seen[0].contains(ChangeScope::TimelineMode));
        assert!(seen[0].contains(ChangeScope::PlaceSet));
    }

    #[test]
    fn test_nested_suspend_emits_only_at_outermost_resume() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let seen = recording(&dataset);

        dataset.suspend_events();
        dataset.suspend_events();
        dataset.set_display_mode(DisplayMode::Confidence);
        dataset.resume_events();
        assert!(seen.lock().is_empty());
        dataset.resume_events();
        assert_eq!(seen.lock().len(), 1);

        // unbalanced resume is ignored
        dataset.resume_events();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_unchanged_filter_is_silent() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let seen = recording(&dataset);
        dataset.set_place_filter(None);
        dataset.set_display_mode(DisplayMode::Religion);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_active_is_conjunction_of_all_filters() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();

        dataset.set_time_filter(Some(TimeSpan::new(810, 1000)));
        // tuple 4 out by time; 2 is untimed and stays
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 3]));

        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([2])));
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 3]));

        dataset.set_tags_filter(Some(IdSet::from([1])));
        assert_eq!(active_ids(&dataset), BTreeSet::from([3]));
        assert_eq!(dataset.active_places(), &IdSet::from([2]));

        dataset.clear_filter(FilterDimension::Tags);
        dataset.clear_filter(FilterDimension::Religion);
        dataset.clear_filter(FilterDimension::Time);
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn test_complex_religion_filter_requires_co_occurrence() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();

        // Baghdad has 2 and 3, Mosul only 2
        dataset.set_religion_filter(ReligionFilter::Complex(vec![IdSet::from([2, 3])]));
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2]));

        dataset.set_religion_filter(ReligionFilter::Complex(vec![IdSet::from([2, 3]), IdSet::from([3])]));
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 4]));
    }

    #[test]
    fn test_confidence_containment_with_explicit_null() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();

        dataset.set_confidence_range(ConfidenceAspect::Interpretation, BTreeSet::from([None]));
        assert_eq!(active_ids(&dataset), BTreeSet::from([2]));

        dataset.set_confidence_range(
            ConfidenceAspect::Interpretation,
            BTreeSet::from([Some(Confidence::Certain), Some(Confidence::Probable)]),
        );
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 3]));
    }

    #[test]
    fn test_map_filter_drops_unplaced() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        dataset.set_map_filter(Some(GeoBounds { north: 34.0, south: 30.0, east: 50.0, west: 40.0 }));
        assert_eq!(dataset.filters().location, Some(IdSet::from([1])));
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2]));
        dataset.set_map_filter(None);
        assert_eq!(dataset.filters().location, None);
    }

    #[test]
    fn test_hierarchy_filter_collapses_to_all() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        dataset.update_hierarchy_filters(IdSet::from([1, 2]));
        assert_eq!(dataset.filters().religion, ReligionFilter::Simple(IdSet::from([1, 2])));
        dataset.update_hierarchy_filters(IdSet::from([1, 2, 3]));
        assert_eq!(dataset.filters().religion, ReligionFilter::All);
    }

    #[test]
    fn test_set_state_is_atomic_and_validated() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        let seen = recording(&dataset);

        let mut state = FilterState::default();
        state.time = Some(TimeSpan::new(890, 960));
        state.source = Some(IdSet::from([2]));
        dataset.set_state(state.clone()).unwrap();
        assert_eq!(dataset.get_state(), state);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(active_ids(&dataset), BTreeSet::from([2, 3]));

        let mut bad = FilterState::default();
        bad.tags = Some(IdSet::from([77]));
        let err = dataset.set_state(bad).unwrap_err();
        assert!(matches!(err, DataError::UnknownId { kind: "tag", id: 77 }));
        // nothing applied
        assert_eq!(dataset.get_state(), state);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_replay_state_on_load() {
        let mut dataset = Dataset::default();
        let seen = recording(&dataset);
        let mut state = FilterState::default();
        state.location = Some(IdSet::from([2]));
        dataset.load_with_state(sample(), Some(state)).unwrap();

        assert_eq!(active_ids(&dataset), BTreeSet::from([3]));
        assert_eq!(seen.lock().as_slice(), &[ScopeSet::All]);
    }

    #[test]
    fn test_rejected_replay_still_loads() {
        let mut dataset = Dataset::default();
        let seen = recording(&dataset);
        let mut state = FilterState::default();
        state.location = Some(IdSet::from([99]));

        let err = dataset.load_with_state(sample(), Some(state)).unwrap_err();
        assert!(matches!(&err, DataError::Replay(inner) if matches!(**inner, DataError::UnknownId { kind: "place", id: 99 })));
        assert_eq!(dataset.filters(), &FilterState::default());
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(seen.lock().as_slice(), &[ScopeSet::All]);
    }

    #[test]
    fn test_inverted_time_span_is_rejected() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();

        let mut raw = sample();
        raw.tuples[0].time_span = Some(TimeSpan::new(900, 800));
        let err = dataset.load(raw).unwrap_err();
        assert!(matches!(err, DataError::InvalidState(_)));
        // the previous dataset stays in place
        assert_eq!(active_ids(&dataset), BTreeSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn test_place_data_and_confidence_data() {
        let mut dataset = Dataset::default();
        dataset.load(sample()).unwrap();
        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([3])));

        let baghdad = dataset.place_data().into_iter().find(|p| p.place_id == 1).unwrap();
        assert!(baghdad.active);
        assert_eq!((baghdad.active_tuples, baghdad.inactive_tuples), (1, 1));
        assert_eq!(baghdad.religion_ids, IdSet::from([2, 3]));

        let data = dataset.confidence_data();
        let interp = &data[&ConfidenceAspect::Interpretation];
        assert_eq!(interp[Confidence::rank(Some(Confidence::Certain))].inactive, 1);
        assert_eq!(interp[Confidence::rank(None)].active, 1);
        // source confidence is empty everywhere and counts as unknown
        assert_eq!(data[&ConfidenceAspect::Sources][5].active + data[&ConfidenceAspect::Sources][5].inactive, 4);
    }
}
