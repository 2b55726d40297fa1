//! Wiring of the coordinator and one worker per view

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use damast_core::{Envelope, MessageType};
use damast_data::DatasetSource;
use damast_views::{ViewWorkers, WorkerInput};

use crate::collab::{FilterDescriber, HtmlFilterDescriber, RegexNameSearch};
use crate::coordinator::{Coordinator, LoadRequest};

/// A running pipeline. Envelopes addressed to a view go to its worker,
/// everything else to the coordinator; every view-bound envelope comes
/// back out of [`Pipeline::recv`].
pub struct Pipeline {
    requests: mpsc::UnboundedSender<Envelope>,
    output: mpsc::UnboundedReceiver<Envelope>,
    views: ViewWorkers,
    stop: oneshot::Sender<()>,
    coordinator: JoinHandle<()>,
}

impl Pipeline {
    pub fn start() -> Self {
        Self::with_describer(Arc::new(HtmlFilterDescriber))
    }

    pub fn with_describer(describer: Arc<dyn FilterDescriber>) -> Self {
        let (main, output) = mpsc::unbounded_channel();
        let (requests, inbox) = mpsc::unbounded_channel();
        let alternative_names = Arc::new(RegexNameSearch::new());

        let views = ViewWorkers::spawn(main.clone(), requests.clone(), alternative_names.clone());
        let mut coordinator = Coordinator::new(main, describer, alternative_names);
        for (view, port) in views.ports() {
            coordinator.connect(view, port.clone());
        }

        let (stop, stopped) = oneshot::channel();
        let coordinator = tokio::spawn(coordinator.run(inbox, stopped));
        info!("pipeline started");

        Self { requests, output, views, stop, coordinator }
    }

    pub fn send(&self, envelope: Envelope) -> Result<()> {
        if let Some(target) = envelope.target.as_deref() {
            let view = envelope
                .target_view()
                .ok_or_else(|| anyhow!("unknown target view `{target}`"))?;
            let Some(port) = self.views.port(view) else {
                bail!("no worker serves the {view} view");
            };
            return port
                .send(WorkerInput::Main(envelope))
                .map_err(|_| anyhow!("{view} worker is gone"));
        }
        self.requests
            .send(envelope)
            .map_err(|_| anyhow!("coordinator is gone"))
    }

    /// Route one JSON line. A line that does not parse or names an unknown
    /// view is logged and dropped; returns whether it was routed.
    pub fn submit(&self, line: &str) -> bool {
        let routed = Envelope::parse(line)
            .map_err(anyhow::Error::from)
            .and_then(|envelope| self.send(envelope));
        match routed {
            Ok(()) => true,
            Err(err) => {
                error!("rejected input line: {err:#}");
                false
            }
        }
    }

    /// Fetch a dataset and hand it to the coordinator, together with the
    /// filters the source wants replayed
    pub async fn load(&self, source: &dyn DatasetSource) -> Result<()> {
        let dataset = source
            .fetch()
            .await
            .with_context(|| format!("fetching {}", source.source_name()))?;
        let filters = source
            .saved_state()
            .await
            .with_context(|| format!("reading saved state of {}", source.source_name()))?;
        self.send(Envelope::new(MessageType::LoadData, &LoadRequest { dataset, filters })?)
    }

    /// Next envelope bound for a view's main thread
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.output.recv().await
    }

    /// Stop the coordinator once its queue is empty, then let every worker
    /// drain. Returns the output channel, which closes after the last unit
    /// stopped.
    pub async fn shutdown(self) -> Result<mpsc::UnboundedReceiver<Envelope>> {
        let Self { requests, output, views, stop, coordinator } = self;
        drop(requests);
        // the coordinator is already gone if the send fails
        let _ = stop.send(());
        coordinator.await.context("coordinator task failed")?;
        views.shutdown().await;
        info!("pipeline stopped");
        Ok(output)
    }
}
