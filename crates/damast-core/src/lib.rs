//! Core functionality for the damast visualization pipeline
//! 
//! This crate provides the shared vocabulary every compute unit speaks:
//! entity ids, change scopes and the event bus, view settings, the message
//! envelope, the brush link contract and cancellation.

pub mod cancel;
pub mod events;
pub mod ids;
pub mod message;
pub mod settings;
pub mod sync;

// Re-export commonly used types
pub use cancel::{CancelSlot, CancelToken, Cancelled};
pub use events::{ChangeScope, EventBus, ScopeSet};
pub use ids::{IdSet, PlaceId, ReligionId, SourceId, TagId, TupleId};
pub use message::{Envelope, MessageError, MessageType, ViewKind};
pub use settings::{ConfidenceAspect, DisplayMode, MapMode, TimelineMode, ViewSettings};
pub use sync::{BrushFanout, BrushLink, BrushLinks, BrushRound, BrushUpdate, NoopLink, RoundCounter, RoundGate};
