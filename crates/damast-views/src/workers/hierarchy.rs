//! Religion hierarchy worker

use std::sync::Arc;

use async_trait::async_trait;

use damast_core::{BrushUpdate, Envelope, IdSet, ReligionId, ViewKind};
use damast_data::DatasetSnapshot;

use crate::derive::hierarchy::hierarchy_glyphs;
use crate::worker::{forward_or_reject, publish, BrushIds, DataEvent, DataWorker, WorkerContext, WorkerError};

/// Recomputes glyphs locally on brush so brushed nodes are marked
#[derive(Debug, Default)]
pub struct HierarchyWorker {
    snapshot: Option<Arc<DatasetSnapshot>>,
    brushed: Option<IdSet<ReligionId>>,
}

impl HierarchyWorker {
    fn refresh(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let entries = hierarchy_glyphs(
            snapshot.index.hierarchy(),
            &snapshot.tuples,
            |id| snapshot.religion_enabled(id),
            self.brushed.as_ref(),
            &snapshot.settings,
        );
        publish(ctx, &entries)
    }
}

#[async_trait]
impl DataWorker for HierarchyWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Hierarchy
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        if let DataEvent::Dataset(snapshot) = event {
            let _loading = ctx.loading("hierarchy", "Aggregating hierarchy");
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
    use damast_data::{Dataset, ReligionFilter};

    #[tokio::test]
    async fn test_brush_marks_nodes_without_nan() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        dataset.set_religion_filter(ReligionFilter::Simple(IdSet::from([3])));
        dataset.set_show_only_active(true);

        let mut harness = Harness::spawn(HierarchyWorker::default());
        harness.dataset(dataset.snapshot());
        harness.next_main().await;

        harness.brush(1, Some(IdSet::from([2]))).await.unwrap();
        let entries = harness.next_main().await.data;
        let node = entries.as_array().unwrap().iter().find(|e| e["id"] == 2).unwrap();
        assert_eq!(node["brushed"], true);
        assert_eq!(node["glyph"]["active_scale"], 0.0);
    }
}
