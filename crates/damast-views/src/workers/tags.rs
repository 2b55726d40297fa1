//! Tag list worker

use std::sync::Arc;

use async_trait::async_trait;

use damast_core::{BrushUpdate, Envelope, IdSet, TagId, ViewKind};
use damast_data::DatasetSnapshot;

use crate::derive::tags::tag_counts;
use crate::worker::{forward_or_reject, publish, BrushIds, DataEvent, DataWorker, WorkerContext, WorkerError};

#[derive(Debug, Default)]
pub struct TagsWorker {
    snapshot: Option<Arc<DatasetSnapshot>>,
    brushed: Option<IdSet<TagId>>,
}

impl TagsWorker {
    fn refresh(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        match &self.snapshot {
            Some(snapshot) => publish(ctx, &tag_counts(snapshot, self.brushed.as_ref())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataWorker for TagsWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Tags
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        if let DataEvent::Dataset(snapshot) = event {
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
