//! Dataset, filters and brushing for the damast visualization pipeline

pub mod brush;
pub mod dataset;
pub mod filter;
pub mod index;
pub mod model;
pub mod snapshot;
pub mod sources;
pub mod state;

use thiserror::Error;

// Re-exports
pub use brush::{AggregateSelection, Brush, BrushOrigin};
pub use dataset::{confidence_counts, ConfidenceCount, Dataset, PlaceData};
pub use filter::{ConfidenceFilter, ConfidenceRange, FilterDimension, FilterState, GeoBounds, ReligionFilter};
pub use index::{DatasetIndex, HierarchyNode};
pub use model::{Confidence, GeoLocation, Location, RawDataset, Religion, Source, Tag, TimeSpan, Tuple, TupleConfidence};
pub use snapshot::DatasetSnapshot;
pub use sources::{DatasetSource, JsonFileSource};
pub use state::{ImportOutcome, VisualizationState};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown {kind} id {id}")]
    UnknownId { kind: &'static str, id: u32 },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The dataset loaded but the saved filters carried with it were rejected
    #[error("saved filters rejected: {0}")]
    Replay(#[source] Box<DataError>),

    #[error("Other error: {0}")]
    Other(String),
}
