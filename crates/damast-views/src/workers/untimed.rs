//! Untimed worker

use async_trait::async_trait;

use damast_core::{Envelope, ViewKind};

use crate::derive::untimed::untimed_from_tuples;
use crate::worker::{forward_or_reject, publish, DataEvent, DataWorker, WorkerContext, WorkerError};

#[derive(Debug, Default)]
pub struct UntimedWorker;

#[async_trait]
impl DataWorker for UntimedWorker {
    fn view(&self) -> ViewKind {
        ViewKind::Untimed
    }

    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
        forward_or_reject(ctx, envelope)
    }

    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError> {
        let DataEvent::Dataset(snapshot) = event else {
            return Ok(());
        };
        let _loading = ctx.loading("untimed", "Grouping untimed evidence");
        let groups = untimed_from_tuples(
            &snapshot.tuples,
            |id| snapshot.main_religion(id),
            snapshot.religion_order(),
            &snapshot.settings,
        );
        publish(ctx, &groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::fixtures::raw;
    use crate::worker::tests::Harness;
    use damast_core::MessageType;
    use damast_data::Dataset;

    #[tokio::test]
    async fn test_publishes_groups() {
        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();

        let mut harness = Harness::spawn(UntimedWorker);
        harness.dataset(dataset.snapshot());
        let data = harness.next_main().await;
        assert_eq!(data.kind, MessageType::SetData);
        // only tuple 2 (Judaism) is untimed
        assert_eq!(data.data[0]["main_religion_id"], 3);
        assert_eq!(data.data[0]["rows"][0]["active"]["tuple_ids"], serde_json::json!([2]));
    }

    #[tokio::test]
    async fn test_unknown_main_message_keeps_worker_alive() {
        let mut harness = Harness::spawn(UntimedWorker);
        let search = Envelope::new(MessageType::Search, &"x").unwrap();
        harness.port.send(crate::worker::WorkerInput::Main(search)).unwrap();

        let mut dataset = Dataset::default();
        dataset.load(raw()).unwrap();
        harness.dataset(dataset.snapshot());
        assert_eq!(harness.next_main().await.kind, MessageType::SetData);
    }
}
