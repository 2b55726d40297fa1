//! Confidence worker

use async_trait::async_trait;

use damast_core::{Envelope, ViewKind};

use crate::derive::confidence::confidence_view_data;
use crate::worker::{forward_or_reject, publish, DataEvent, DataWorker, WorkerContext, WorkerError};

/// Histogram of every confidence aspect; not brush linked
#[derive(Debug, Default)]
pub struct ConfidenceWorker;

#[async_trait]
impl DataWorker for ConfidenceWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Confidence
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        match event {
            DataEvent::Dataset(snapshot) => publish(ctx, &confidence_view_data(&snapshot)),
            DataEvent::AlternativeNames { .. } => Ok(()),
        }
    }
}
