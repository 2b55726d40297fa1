//! The coordinating data unit
//!
//! Owns the [`Dataset`] and the [`Brush`]. Requests arrive as envelopes from
//! the main thread or from view workers and are handled one at a time.
//! After each request the change scopes the dataset reported are drained
//! and only the views depending on them receive a fresh snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use damast_core::events::events::DatasetChanged;
use damast_core::{ConfidenceAspect, Envelope, IdSet, MessageType, PlaceId, ReligionId, ScopeSet, SourceId, TagId, ViewKind};
use damast_data::{
    Brush, BrushOrigin, ConfidenceFilter, ConfidenceRange, DataError, Dataset, FilterDimension, FilterState, GeoBounds,
    ImportOutcome, RawDataset, ReligionFilter, TimeSpan, VisualizationState,
};
use damast_views::{DataEvent, WorkerInput, WorkerPort};

use crate::collab::{FilterDescriber, RegexNameSearch};
use crate::links::brush_links;
use crate::scopes;

/// `load-data` payload: the entity graph plus the filters of a replayed report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadRequest {
    pub dataset: RawDataset,
    #[serde(default)]
    pub filters: Option<FilterState>,
}

/// One filter mutation of a `set-filter` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "kebab-case")]
pub enum FilterUpdate {
    Religion(ReligionFilter),
    Location(Option<IdSet<PlaceId>>),
    Source(Option<IdSet<SourceId>>),
    Tags(Option<IdSet<TagId>>),
    Time(Option<TimeSpan>),
    Confidence(ConfidenceFilter),
    ConfidenceRange { aspect: ConfidenceAspect, range: ConfidenceRange },
    /// Bounding box drawn on the map
    Map(Option<GeoBounds>),
    /// Checked nodes of the religion hierarchy
    Hierarchy(IdSet<ReligionId>),
}

/// `set-filter` carries one update or a batch applied as one change
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FilterRequest {
    One(FilterUpdate),
    Batch(Vec<FilterUpdate>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDescription {
    pub html: String,
}

pub struct Coordinator {
    dataset: Dataset,
    brush: Brush,
    ports: BTreeMap<ViewKind, WorkerPort>,
    main: mpsc::UnboundedSender<Envelope>,
    describer: Arc<dyn FilterDescriber>,
    alternative_names: Arc<RegexNameSearch>,
    pending: Arc<Mutex<ScopeSet>>,
    loaded: bool,
    /// Document of the last successful import, re-exported with its metadata
    imported: Option<VisualizationState>,
}

impl Coordinator {
    pub fn new(
        main: mpsc::UnboundedSender<Envelope>,
        describer: Arc<dyn FilterDescriber>,
        alternative_names: Arc<RegexNameSearch>,
    ) -> Self {
        let dataset = Dataset::default();
        let pending = Arc::new(Mutex::new(ScopeSet::empty()));
        let sink = pending.clone();
        dataset
            .events()
            .on::<DatasetChanged, _>(move |event| sink.lock().merge(event.scopes.clone()));

        Self {
            dataset,
            brush: Brush::default(),
            ports: BTreeMap::new(),
            main,
            describer,
            alternative_names,
            pending,
            loaded: false,
            imported: None,
        }
    }

    /// Register the port of a view worker and link it into the brush
    pub fn connect(&mut self, view: ViewKind, port: WorkerPort) {
        debug!(%view, "view connected");
        self.ports.insert(view, port);
        self.brush.set_links(brush_links(self.ports.iter().map(|(view, port)| (*view, port))));
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Process requests until `stop` fires or every sender is gone.
    ///
    /// Queued requests are handled before a stop takes effect.
    pub async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Envelope>, mut stop: oneshot::Receiver<()>) {
        info!(views = self.ports.len(), "coordinator started");
        loop {
            let envelope = tokio::select! {
                biased;
                envelope = requests.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
                _ = &mut stop => break,
            };
            self.process(envelope).await;
        }
        info!("coordinator stopped");
    }

    /// Handle one request, then dispatch the resulting changes and reply
    pub async fn process(&mut self, envelope: Envelope) {
        let kind = envelope.kind;
        let source = envelope.source.clone();
        let reply = match self.handle(envelope).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(%kind, source = source.as_deref().unwrap_or("main"), "request failed: {err:#}");
                None
            }
        };

        self.dispatch_changes().await;

        if let Some(reply) = reply {
            if self.main.send(reply).is_err() {
                warn!(%kind, "main thread went away, dropping reply");
            }
        }
    }

    async fn handle(&mut self, envelope: Envelope) -> Result<Option<Envelope>> {
        let kind = envelope.kind;
        debug!(%kind, source = ?envelope.source, "request");
        match kind {
            MessageType::LoadData => {
                if let Some(outcome) = self.load(envelope.decode()?)? {
                    return Ok(Some(Envelope::new(kind, &outcome)?));
                }
            }
            MessageType::SetFilter => {
                let updates = match envelope.decode::<FilterRequest>()? {
                    FilterRequest::One(update) => vec![update],
                    FilterRequest::Batch(updates) => updates,
                };
                self.dataset.suspend_events();
                for update in updates {
                    self.apply_filter(update);
                }
                self.dataset.resume_events();
            }
            MessageType::ClearFilter => {
                let dimension: FilterDimension = envelope.decode()?;
                info!(?dimension, "clearing filter");
                self.dataset.clear_filter(dimension);
            }
            MessageType::Brush => {
                let origin: BrushOrigin = envelope.decode()?;
                self.brush.brush(&self.dataset, &origin).await;
            }
            MessageType::ClearBrush => {
                self.brush.reset_brush().await;
            }
            MessageType::SetDisplayMode => self.dataset.set_display_mode(envelope.decode()?),
            MessageType::SetTimelineMode => self.dataset.set_timeline_mode(envelope.decode()?),
            MessageType::SetMapMode => self.dataset.set_map_mode(envelope.decode()?),
            MessageType::SetShowOnlyActive => self.dataset.set_show_only_active(envelope.decode()?),
            MessageType::SetConfidenceAspect => self.dataset.set_confidence_aspect(envelope.decode()?),
            MessageType::NotifyIsLoading => {
                let loading: bool = envelope.decode()?;
                for (view, port) in &self.ports {
                    if port.send(WorkerInput::NotifyIsLoading(loading)).is_err() {
                        warn!(%view, "worker inbox closed");
                    }
                }
            }
            MessageType::ExportVisualizationState => {
                return Ok(Some(Envelope::new(kind, &self.export_state())?));
            }
            MessageType::ImportVisualizationState => {
                let outcome = self.import_state(envelope.data);
                return Ok(Some(Envelope::new(kind, &outcome)?));
            }
            MessageType::DescribeFilters => {
                let snapshot = self.dataset.snapshot();
                match self.describer.describe(&snapshot).await {
                    Ok(html) => return Ok(Some(Envelope::new(kind, &FilterDescription { html })?)),
                    Err(err) => warn!("filter description failed: {err:#}"),
                }
            }
            MessageType::GenerateReport => {
                let mut state = self.export_state();
                let report_id = Uuid::new_v4();
                state.metadata.report_id = Some(report_id);
                info!(%report_id, "report requested");
                return Ok(Some(Envelope::new(kind, &state)?));
            }
            other => return Err(anyhow!("message `{other}` is not handled by the coordinator")),
        }
        Ok(None)
    }

    /// Load a dataset. When saved filters come along, the outcome of
    /// replaying them is the reply, shaped like an import result.
    fn load(&mut self, request: LoadRequest) -> Result<Option<ImportOutcome>> {
        let replay = request.filters.is_some();
        let outcome = match self.dataset.load_with_state(request.dataset, request.filters) {
            Ok(()) => replay.then(ImportOutcome::ok),
            Err(DataError::Replay(err)) => {
                warn!("saved filters were not replayed: {err}");
                Some(ImportOutcome::failed(err.to_string()))
            }
            Err(err) => return Err(err).context("loading dataset"),
        };
        self.imported = None;
        self.loaded = true;
        self.alternative_names.index(self.dataset.places().values());
        Ok(outcome)
    }

    fn apply_filter(&mut self, update: FilterUpdate) {
        debug!(?update, "filter update");
        match update {
            FilterUpdate::Religion(filter) => self.dataset.set_religion_filter(filter),
            FilterUpdate::Location(ids) => self.dataset.set_place_filter(ids),
            FilterUpdate::Source(ids) => self.dataset.set_source_filter(ids),
            FilterUpdate::Tags(ids) => self.dataset.set_tags_filter(ids),
            FilterUpdate::Time(window) => self.dataset.set_time_filter(window),
            FilterUpdate::Confidence(filter) => self.dataset.set_confidence_filter(filter),
            FilterUpdate::ConfidenceRange { aspect, range } => self.dataset.set_confidence_range(aspect, range),
            FilterUpdate::Map(bounds) => self.dataset.set_map_filter(bounds),
            FilterUpdate::Hierarchy(checked) => self.dataset.update_hierarchy_filters(checked),
        }
    }

    fn export_state(&self) -> VisualizationState {
        match &self.imported {
            Some(document) => VisualizationState {
                metadata: document.metadata.clone(),
                filters: self.dataset.get_state(),
            }
            .reexport(),
            None => VisualizationState::export(self.dataset.get_state()),
        }
    }

    /// Never fails across the boundary: problems become `success: false`
    fn import_state(&mut self, data: serde_json::Value) -> ImportOutcome {
        let result = VisualizationState::from_value(data).and_then(|document| {
            self.dataset.set_state(document.filters.clone())?;
            self.imported = Some(document);
            Ok(())
        });
        if let Err(err) = &result {
            warn!("visualization state import failed: {err}");
        }
        result.into()
    }

    /// Send the current snapshot to every view whose projection the pending
    /// scopes touch. A change to filters or the active place set also
    /// clears the highlight.
    async fn dispatch_changes(&mut self) {
        let scopes = std::mem::take(&mut *self.pending.lock());
        if scopes.is_empty() || !self.loaded {
            return;
        }

        let snapshot = self.dataset.snapshot();
        let mut notified = Vec::new();
        for (view, port) in &self.ports {
            if !scopes::affects(&scopes, *view) {
                continue;
            }
            if port.send(WorkerInput::Data(DataEvent::Dataset(snapshot.clone()))).is_err() {
                warn!(%view, "worker inbox closed");
            } else {
                notified.push(view.as_str());
            }
        }
        debug!(generation = snapshot.generation, ?scopes, views = ?notified, "dataset change dispatched");

        if scopes::invalidates_brush(&scopes) {
            self.brush.reset_brush().await;
        }
    }
}
