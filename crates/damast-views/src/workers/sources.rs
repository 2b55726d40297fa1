//! Source list worker

use std::sync::Arc;

use async_trait::async_trait;

use damast_core::{BrushUpdate, Envelope, IdSet, SourceId, ViewKind};
use damast_data::DatasetSnapshot;

use crate::derive::sources::source_stack_data;
use crate::worker::{forward_or_reject, publish, BrushIds, DataEvent, DataWorker, WorkerContext, WorkerError};

#[derive(Debug, Default)]
pub struct SourcesWorker {
    snapshot: Option<Arc<DatasetSnapshot>>,
    brushed: Option<IdSet<SourceId>>,
}

impl SourcesWorker {
    fn refresh(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let stack = source_stack_data(
            snapshot.sources.values(),
            &snapshot.tuples,
            snapshot.religion_order(),
            self.brushed.as_ref(),
            &snapshot.settings,
        );
        publish(ctx, &stack)
    }
}

#[async_trait]
impl DataWorker for SourcesWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Sources
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        if let DataEvent::Dataset(snapshot) = event {
            let _loading = ctx.loading("sources", "Stacking sources");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::raw;
    use crate::worker::tests::Harness;
    use damast_data::Dataset;

    #[tokio::test]
    async fn test_brush_then_clear() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        let mut harness = Harness::spawn(SourcesWorker::default());
        harness.dataset(dataset.snapshot());
        let first = harness.next_main().await.data;
        assert_eq!(first["rows"][0]["total_tuples"], 2);

        harness.brush(1, Some(IdSet::from([2]))).await.unwrap();
        let brushed = harness.next_main().await.data;
        assert_eq!(brushed["rows"][1]["brushed"], true);

        harness.brush(2, None).await.unwrap();
        let cleared = harness.next_main().await.data;
        assert_eq!(cleared, first);
    }
}
