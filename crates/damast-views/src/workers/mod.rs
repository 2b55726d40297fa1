//! One worker per view

mod confidence;
mod hierarchy;
mod location_list;
mod map;
mod sources;
mod tags;
mod timeline;
mod untimed;

pub use confidence::ConfidenceWorker;
pub use hierarchy::HierarchyWorker;
pub use location_list::{AltNameQuery, AlternativeNameSearch, LocationListWorker};
pub use map::MapWorker;
pub use sources::SourcesWorker;
pub use tags::TagsWorker;
pub use timeline::TimelineWorker;
pub use untimed::UntimedWorker;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::warn;

use damast_core::{Envelope, ViewKind};

use crate::worker::{spawn, WorkerPort};

/// The running workers of every view
pub struct ViewWorkers {
    ports: BTreeMap<ViewKind, WorkerPort>,
    handles: Vec<JoinHandle<()>>,
}

impl ViewWorkers {
    /// Spawn one worker per [`ViewKind`]. All of them post view-bound
    /// messages to `main` and requests to `data`.
    pub fn spawn(
        main: UnboundedSender<Envelope>,
        data: UnboundedSender<Envelope>,
        alternative_names: Arc<dyn AlternativeNameSearch>,
    ) -> Self {
        let mut ports = BTreeMap::new();
        let mut handles = Vec::new();
        for view in ViewKind::ALL {
            let (port, handle) = match view {
                ViewKind::LocationList => spawn(
                    LocationListWorker::new(alternative_names.clone()),
                    main.clone(),
                    data.clone(),
                ),
                ViewKind::Map => spawn(MapWorker::default(), main.clone(), data.clone()),
                ViewKind::Untimed => spawn(UntimedWorker, main.clone(), data.clone()),
                ViewKind::Timeline => spawn(TimelineWorker, main.clone(), data.clone()),
                ViewKind::Hierarchy => spawn(HierarchyWorker::default(), main.clone(), data.clone()),
                ViewKind::Sources => spawn(SourcesWorker::default(), main.clone(), data.clone()),
                ViewKind::Tags => spawn(TagsWorker::default(), main.clone(), data.clone()),
                ViewKind::Confidence => spawn(ConfidenceWorker, main.clone(), data.clone()),
            };
            ports.insert(view, port);
            handles.push(handle);
        }
        Self { ports, handles }
    }

    pub fn port(&self, view: ViewKind) -> Option<&WorkerPort> {
        self.ports.get(&view)
    }

    pub fn ports(&self) -> impl Iterator<Item = (ViewKind, &WorkerPort)> {
        self.ports.iter().map(|(view, port)| (*view, port))
    }

    /// Close every inbox and wait for the workers to drain
    pub async fn shutdown(self) {
        drop(self.ports);
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!("worker task failed: {err}");
            }
        }
    }
}
