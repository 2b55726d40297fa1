//! Per-view compute units for the damast visualization pipeline
//!
//! `derive` holds the pure aggregation algorithms, `worker` the message
//! routing substrate and `workers` one unit per view built on both.

pub mod derive;
pub mod worker;
pub mod workers;

pub use worker::{
    spawn, BrushIds, DataEvent, DataWorker, LoadingMessage, MessageGuard, WorkerContext, WorkerError, WorkerInput,
    WorkerPort,
};
pub use workers::{
    AltNameQuery, AlternativeNameSearch, ConfidenceWorker, HierarchyWorker, LocationListWorker, MapWorker,
    SourcesWorker, TagsWorker, TimelineWorker, UntimedWorker, ViewWorkers,
};
