//! Timeline worker

use async_trait::async_trait;
use tracing::debug;

use damast_core::{Envelope, ViewKind};

use crate::derive::timeline::timed_from_tuples;
use crate::worker::{forward_or_reject, publish, DataEvent, DataWorker, WorkerContext, WorkerError};

/// Stacks timed evidence per year. Brushes are highlighted by the view
/// itself from the forwarded tuple ids.
#[derive(Debug, Default)]
pub struct TimelineWorker;

#[async_trait]
impl DataWorker for TimelineWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Timeline
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        let DataEvent::Dataset(snapshot) = event else {
            return Ok(());
        };
        let _loading = ctx.loading("timeline", "Stacking timeline");
        let data = timed_from_tuples(
            &snapshot.tuples,
            snapshot.religion_order(),
            &snapshot.settings,
            snapshot.year_range(),
        );
        debug!(generation = snapshot.generation, layers = data.layers.len(), "timeline derived");
        publish(ctx, &data)
    }
}
