//! Brush links that deliver a round into a view worker's inbox

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::sync::oneshot;

use damast_core::{BrushLink, BrushLinks, BrushUpdate, IdSet, ViewKind};
use damast_views::{WorkerInput, WorkerPort};

/// Link into one worker. Settles once the worker applied the round.
pub struct PortLink {
    view: ViewKind,
    port: WorkerPort,
}

impl PortLink {
    pub fn new(view: ViewKind, port: WorkerPort) -> Self {
        Self { view, port }
    }
}

#[async_trait]
impl BrushLink<IdSet<u32>> for PortLink {
    async fn link(&self, update: BrushUpdate<IdSet<u32>>) -> anyhow::Result<()> {
        let (ack, done) = oneshot::channel();
        self.port
            .send(WorkerInput::Brush { update, ack: Some(ack) })
            .map_err(|_| anyhow!("{} worker is gone", self.view))?;
        done.await
            .with_context(|| format!("{} worker dropped the brush round", self.view))?
            .map_err(|err| anyhow!("{} worker: {err}", self.view))
    }
}

/// Build the seven link slots from the available worker ports.
///
/// A slot without a worker keeps the no-op link.
pub fn brush_links<'a>(ports: impl IntoIterator<Item = (ViewKind, &'a WorkerPort)>) -> BrushLinks {
    let mut links = BrushLinks::default();
    for (view, port) in ports {
        let link = Arc::new(PortLink::new(view, port.clone()));
        match view {
            ViewKind::LocationList => links.location_list = link,
            ViewKind::Map => links.map = link,
            ViewKind::Untimed => links.untimed = link,
            ViewKind::Timeline => links.timeline = link,
            ViewKind::Hierarchy => links.hierarchy = link,
            ViewKind::Sources => links.sources = link,
            ViewKind::Tags => links.tags = link,
            // histogram of the whole dataset, never highlighted
            ViewKind::Confidence => {}
        }
    }
    links
}
