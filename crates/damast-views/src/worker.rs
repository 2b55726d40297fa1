//! Data worker abstraction - base trait for every per-view compute unit
//!
//! A worker owns the state of one view and talks to two peers: the view's
//! main thread (render side) and the coordinating data unit. Everything
//! arrives through a single inbox and is processed one message at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use damast_core::{BrushUpdate, Envelope, IdSet, MessageError, MessageType, PlaceId, RoundGate, ViewKind};
use damast_data::DatasetSnapshot;

/// Errors raised inside a worker
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("{0} channel closed")]
    Closed(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Ids of one brush link invocation. Every id type is a `u32`, the view
/// knows which entity its ids refer to.
pub type BrushIds = IdSet<u32>;

/// Messages from the coordinating data unit
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// Fresh projection after a change this view depends on
    Dataset(Arc<DatasetSnapshot>),
    /// Completion of an alternative-name lookup started by the worker
    AlternativeNames { generation: u64, place_ids: IdSet<PlaceId> },
}

/// Everything a worker's inbox accepts
#[derive(Debug)]
pub enum WorkerInput {
    /// From the view's main thread
    Main(Envelope),
    Data(DataEvent),
    /// Brush link invocation, acknowledged once applied
    Brush {
        update: BrushUpdate<BrushIds>,
        ack: Option<oneshot::Sender<Result<(), String>>>,
    },
    /// Passed through to the main thread
    NotifyIsLoading(bool),
}

/// Sending half of a worker's inbox
pub type WorkerPort = mpsc::UnboundedSender<WorkerInput>;

/// Payload of `set-message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingMessage {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Handles a worker uses to reach its peers
#[derive(Clone)]
pub struct WorkerContext {
    view: ViewKind,
    main: mpsc::UnboundedSender<Envelope>,
    data: mpsc::UnboundedSender<Envelope>,
    inbox: mpsc::WeakUnboundedSender<WorkerInput>,
    messages: Arc<Mutex<BTreeMap<String, String>>>,
}

impl WorkerContext {
    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn send_to_main(&self, envelope: Envelope) -> Result<(), WorkerError> {
        self.main
            .send(envelope.with_source(self.view))
            .map_err(|_| WorkerError::Closed("main"))
    }

    pub fn send_to_data(&self, envelope: Envelope) -> Result<(), WorkerError> {
        self.data
            .send(envelope.with_source(self.view))
            .map_err(|_| WorkerError::Closed("data"))
    }

    /// Post into this worker's own inbox, used by spawned work to report back
    pub fn post(&self, input: WorkerInput) -> Result<(), WorkerError> {
        self.inbox
            .upgrade()
            .ok_or(WorkerError::Closed("inbox"))?
            .send(input)
            .map_err(|_| WorkerError::Closed("inbox"))
    }

    /// Show a transient message under `key`; other keys are left alone
    pub fn set_message(&self, key: &str, text: &str) -> Result<(), WorkerError> {
        self.messages.lock().insert(key.to_string(), text.to_string());
        let payload = LoadingMessage { key: key.to_string(), text: Some(text.to_string()) };
        self.send_to_main(Envelope::new(MessageType::SetMessage, &payload)?)
    }

    pub fn clear_message(&self, key: &str) -> Result<(), WorkerError> {
        if self.messages.lock().remove(key).is_none() {
            return Ok(());
        }
        let payload = LoadingMessage { key: key.to_string(), text: None };
        self.send_to_main(Envelope::new(MessageType::ClearMessage, &payload)?)
    }

    /// Set a message that is cleared when the guard drops, on every path
    pub fn loading(&self, key: &str, text: &str) -> MessageGuard {
        if let Err(err) = self.set_message(key, text) {
            warn!(view = %self.view, key, "failed to set message: {err}");
        }
        MessageGuard { ctx: self.clone(), key: key.to_string() }
    }
}

/// Clears its message on drop
pub struct MessageGuard {
    ctx: WorkerContext,
    key: String,
}

impl Drop for MessageGuard {
    fn drop(&mut self) {
        if let Err(err) = self.ctx.clear_message(&self.key) {
            debug!(view = %self.ctx.view, key = %self.key, "failed to clear message: {err}");
        }
    }
}

/// Base trait for all view workers
#[async_trait]
pub trait DataWorker: Send + 'static {
    fn view(&self) -> ViewKind;

    /// A message from the view's main thread
    async fn handle_main_event(&mut self, ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError>;

    /// A message from the coordinating data unit
    async fn handle_data_event(&mut self, ctx: &WorkerContext, event: DataEvent) -> Result<(), WorkerError>;

    /// Apply a brush round. Forwards verbatim to the main thread unless
    /// the view recomputes locally.
    async fn on_brush(&mut self, ctx: &WorkerContext, update: BrushUpdate<BrushIds>) -> Result<(), WorkerError> {
        forward_brush(ctx, &update)
    }
}

/// `set-brush` / `clear-brush` to the main thread
pub fn forward_brush(ctx: &WorkerContext, update: &BrushUpdate<BrushIds>) -> Result<(), WorkerError> {
    let kind = if update.is_clear() { MessageType::ClearBrush } else { MessageType::SetBrush };
    ctx.send_to_main(Envelope::new(kind, update)?)
}

/// Route the main-thread messages every view hands to the data unit.
///
/// Returns the envelope back when it is not one of them.
pub fn forward_user_event(ctx: &WorkerContext, envelope: Envelope) -> Result<Option<Envelope>, WorkerError> {
    match envelope.kind {
        MessageType::Brush
        | MessageType::ClearBrush
        | MessageType::SetFilter
        | MessageType::ClearFilter => {
            ctx.send_to_data(envelope)?;
            Ok(None)
        }
        _ => Ok(Some(envelope)),
    }
}

/// The error for a main-thread message a view has no use for
pub fn unhandled(view: ViewKind, envelope: &Envelope) -> WorkerError {
    MessageError::Unhandled { kind: envelope.kind, view }.into()
}

/// Main-event handling of views without messages of their own
pub fn forward_or_reject(ctx: &WorkerContext, envelope: Envelope) -> Result<(), WorkerError> {
    match forward_user_event(ctx, envelope)? {
        None => Ok(()),
        Some(envelope) => Err(unhandled(ctx.view(), &envelope)),
    }
}

/// Send the projection of a view to its main thread
pub fn publish<T: Serialize>(ctx: &WorkerContext, data: &T) -> Result<(), WorkerError> {
    ctx.send_to_main(Envelope::new(MessageType::SetData, data)?)
}

/// Spawn `worker` on the current runtime and return its inbox
pub fn spawn<W: DataWorker>(
    worker: W,
    main: mpsc::UnboundedSender<Envelope>,
    data: mpsc::UnboundedSender<Envelope>,
) -> (WorkerPort, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let ctx = WorkerContext {
        view: worker.view(),
        main,
        data,
        inbox: tx.downgrade(),
        messages: Arc::default(),
    };
    let handle = tokio::spawn(run(worker, ctx, rx));
    (tx, handle)
}

async fn run<W: DataWorker>(mut worker: W, ctx: WorkerContext, mut inbox: mpsc::UnboundedReceiver<WorkerInput>) {
    let view = ctx.view();
    let mut gate = RoundGate::default();
    info!(%view, "worker started");

    while let Some(input) = inbox.recv().await {
        let result = match input {
            WorkerInput::Main(envelope) => worker.handle_main_event(&ctx, envelope).await,
            WorkerInput::Data(event) => worker.handle_data_event(&ctx, event).await,
            WorkerInput::Brush { update, ack } => {
                let result = if gate.accept(update.round) {
                    worker.on_brush(&ctx, update).await
                } else {
                    debug!(%view, round = update.round, last = ?gate.last(), "dropping stale brush round");
                    Ok(())
                };
                if let Some(ack) = ack {
                    let _ = ack.send(result.as_ref().map_err(|err| err.to_string()).copied());
                }
                result
            }
            WorkerInput::NotifyIsLoading(loading) => Envelope::new(MessageType::NotifyIsLoading, &loading)
                .map_err(WorkerError::from)
                .and_then(|envelope| ctx.send_to_main(envelope)),
        };

        match result {
            Ok(()) => {}
            Err(WorkerError::Closed(peer)) => {
                warn!(%view, peer, "peer went away, stopping worker");
                break;
            }
            Err(err) => error!(%view, "{err}"),
        }
    }

    info!(%view, "worker stopped");
}
