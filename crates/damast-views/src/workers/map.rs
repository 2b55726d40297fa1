//! Map worker

use std::sync::Arc;

use async_trait::async_trait;

use damast_core::{BrushUpdate, Envelope, IdSet, PlaceId, ViewKind};
use damast_data::DatasetSnapshot;

use crate::derive::map::map_data;
use crate::worker::{forward_or_reject, publish, BrushIds, DataEvent, DataWorker, WorkerContext, WorkerError};

/// Per-place glyphs; clustering in the current map mode is left to the view
#[derive(Debug, Default)]
pub struct MapWorker {
    snapshot: Option<Arc<DatasetSnapshot>>,
    brushed: Option<IdSet<PlaceId>>,
}

impl MapWorker {
    fn refresh(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        match &self.snapshot {
            Some(snapshot) => publish(ctx, &map_data(snapshot, self.brushed.as_ref())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataWorker for MapWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Map
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        if let DataEvent::Dataset(snapshot) = event {
            let _loading = ctx.loading("map", "Placing glyphs");
            self.snapshot = Some(snapshot);
            self.refresh(ctx)?;
        }
        Ok(())
    }

    async fn on_brush(&mut self, ctx: &WorkerContext, update: BrushUpdate<BrushIds>) -> Result<(), WorkerError> {
        self.brushed = update.ids;
        self.refresh(ctx)
    }
}
