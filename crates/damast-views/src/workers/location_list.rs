//! Location list worker
//!
//! Searching matches names locally and asks the alternative-name search
//! for the rest. That lookup is the one long-running operation of the
//! list: a newer search or brush cancels it, and a result that still
//! arrives late is dropped by its generation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use damast_core::{BrushUpdate, CancelSlot, Envelope, IdSet, MessageType, PlaceId, ViewKind};
use damast_data::DatasetSnapshot;

use crate::derive::locations::{arrange, location_rows, LocationSearch};
use crate::worker::{
    forward_user_event, publish, unhandled, BrushIds, DataEvent, DataWorker, WorkerContext, WorkerError, WorkerInput,
};

/// Request body of the alternative-name search: `{ regex, ignore_case }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltNameQuery {
    pub regex: String,
    pub ignore_case: bool,
}

/// Finds places by their alternative names
#[async_trait]
pub trait AlternativeNameSearch: Send + Sync {
    async fn search(&self, query: AltNameQuery) -> anyhow::Result<IdSet<PlaceId>>;
}

/// Payload of the `search` message
#[derive(Debug, Clone, Deserialize)]
struct SearchRequest {
    query: String,
}

const LOOKUP_MESSAGE: &str = "alternative-names";

pub struct LocationListWorker {
    search_backend: Arc<dyn AlternativeNameSearch>,
    snapshot: Option<Arc<DatasetSnapshot>>,
    brushed: Option<IdSet<PlaceId>>,
    search: LocationSearch,
    lookup: CancelSlot,
    generation: u64,
}

impl LocationListWorker {
    pub fn new(search_backend: Arc<dyn AlternativeNameSearch>) -> Self {
        Self {
            search_backend,
            snapshot: None,
            brushed: None,
            search: LocationSearch::default(),
            lookup: CancelSlot::new(),
            generation: 0,
        }
    }

    fn refresh(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        publish(ctx, &arrange(location_rows(snapshot), self.brushed.as_ref(), &self.search))
    }

    /// Cancel the outstanding lookup and start one for the current query
    fn restart_lookup(&mut self, ctx: &WorkerContext) {
        self.generation += 1;
        if !self.search.is_active() {
            self.lookup.cancel();
            return;
        }

        let token = self.lookup.replace();
        let generation = self.generation;
        let backend = self.search_backend.clone();
        let query = AltNameQuery {
            regex: regex::escape(&self.search.query),
            ignore_case: true,
        };
        let loading = ctx.loading(&format!("{LOOKUP_MESSAGE}-{generation}"), "Searching alternative names");
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let _loading = loading;
            match token.run(backend.search(query)).await {
                Ok(Ok(place_ids)) => {
                    let event = DataEvent::AlternativeNames { generation, place_ids };
                    if let Err(err) = ctx.post(WorkerInput::Data(event)) {
                        debug!("lookup finished after the list went away: {err}");
                    }
                }
                Ok(Err(err)) => warn!("alternative name search failed: {err:#}"),
                // superseded by a newer search or brush
                Err(_cancelled) => {}
            }
        });
    }
}

#[async_trait]
impl DataWorker for LocationListWorker {
    fn view(&self) -> ViewKind {
        ViewKind::LocationList
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        let Some(envelope) = forward_user_event(ctx, envelope)? else {
            return Ok(());
        };
        match envelope.kind {
            MessageType::Search => {
                let request: SearchRequest = envelope.decode()?;
                self.search = LocationSearch::new(&request.query);
                self.restart_lookup(ctx);
                self.refresh(ctx)
            }
            _ => Err(unhandled(self.view(), &envelope)),
        }
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        match event {
            DataEvent::Dataset(snapshot) => {
                self.snapshot = Some(snapshot);
                self.refresh(ctx)
            }
            DataEvent::AlternativeNames { generation, place_ids } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "dropping stale alternative-name result");
                    return Ok(());
                }
                self.search.alternative_matches = place_ids;
                self.refresh(ctx)
            }
        }
    }

    async fn on_brush(&mut self, ctx: &WorkerContext, update: BrushUpdate<BrushIds>) -> Result<(), WorkerError> {
        self.brushed = update.ids;
        if self.search.is_active() {
            self.restart_lookup(ctx);
        }
        self.refresh(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::raw;
    use crate::worker::tests::Harness;
    use damast_data::Dataset;
    use tokio::sync::Notify;

    /// `slow` blocks until released and then claims place 1; anything else
    /// answers place 2 right away
    struct Gated {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl AlternativeNameSearch for Gated {
        async fn search(&self, query: AltNameQuery) -> anyhow::Result<IdSet<PlaceId>> {
            if query.regex == "slow" {
                self.release.notified().await;
                return Ok(IdSet::from([1]));
            }
            Ok(IdSet::from([2]))
        }
    }

    fn search(query: &str) -> WorkerInput {
        WorkerInput::Main(Envelope::new(MessageType::Search, &serde_json::json!({ "query": query })).unwrap())
    }

    fn ids(rows: &serde_json::Value) -> Vec<u64> {
        rows.as_array().unwrap().iter().map(|r| r["place_id"].as_u64().unwrap()).collect()
    }

    async fn started() -> (Harness, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let backend = Arc::new(Gated { release: release.clone() });
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();

        let mut harness = Harness::spawn(LocationListWorker::new(backend));
        harness.dataset(dataset.snapshot());
        harness.next_main().await;
        (harness, release)
    }

    #[tokio::test]
    async fn test_cancelled_lookup_never_overwrites_newer_search() {
        let (mut harness, release) = started().await;

        harness.port.send(search("slow")).unwrap();
        assert_eq!(ids(&harness.next_main().await.data), Vec::<u64>::new());

        harness.port.send(search("fast")).unwrap();
        assert_eq!(ids(&harness.next_main().await.data), Vec::<u64>::new());
        let rows = harness.next_main().await.data;
        assert_eq!(ids(&rows), [2]);
        assert_eq!(rows[0]["rank"], "alternative-name");

        release.notify_one();
        harness.port.send(WorkerInput::NotifyIsLoading(false)).unwrap();
        loop {
            let envelope = harness.next_main().await;
            if envelope.kind == MessageType::NotifyIsLoading {
                break;
            }
            assert_ne!(ids(&envelope.data), [1], "stale lookup leaked into the list");
        }
    }

    #[tokio::test]
    async fn test_brush_floats_places_and_keeps_search() {
        let (mut harness, _release) = started().await;

        harness.brush(1, Some(IdSet::from([3]))).await.unwrap();
        let rows = harness.next_main().await.data;
        assert_eq!(ids(&rows), [3, 1, 2]);
        assert_eq!(rows[0]["brushed"], true);

        harness.port.send(search("ba")).unwrap();
        assert_eq!(ids(&harness.next_main().await.data), [1]);
    }

    #[tokio::test]
    async fn test_lookup_message_is_cleared() {
        let (mut harness, _release) = started().await;
        harness.port.send(search("fast")).unwrap();

        let mut set = false;
        loop {
            let envelope = harness.main.recv().await.unwrap();
            match envelope.kind {
                MessageType::SetMessage => set = true,
                MessageType::ClearMessage => {
                    assert!(envelope.data["key"].as_str().unwrap().starts_with(LOOKUP_MESSAGE));
                    break;
                }
                _ => {}
            }
        }
        assert!(set);
    }
}
