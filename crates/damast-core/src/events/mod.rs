//! Change scopes and the dataset event bus

use std::collections::BTreeSet;
use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// What changed in the dataset, i.e. which derived views have to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeScope {
    ReligionFilter,
    PlaceFilter,
    SourceFilter,
    TagFilter,
    TimeFilter,
    ConfidenceFilter,
    /// The set of active places changed
    PlaceSet,
    DisplayMode,
    TimelineMode,
    MapMode,
    ConfidenceAspect,
    ShowOnlyActive,
}

impl ChangeScope {
    /// Scopes that flip `active` flags on tuples.
    pub const FILTERS: [ChangeScope; 6] = [
        ChangeScope::ReligionFilter,
        ChangeScope::PlaceFilter,
        ChangeScope::SourceFilter,
        ChangeScope::TagFilter,
        ChangeScope::TimeFilter,
        ChangeScope::ConfidenceFilter,
    ];
}

/// Set of scopes carried by one change notification.
///
/// `All` is the "everything changed" marker used for loads and imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeSet {
    All,
    Only(BTreeSet<ChangeScope>),
}

impl Default for ScopeSet {
    fn default() -> Self {
        ScopeSet::Only(BTreeSet::new())
    }
}

impl ScopeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(scopes: impl IntoIterator<Item = ChangeScope>) -> Self {
        ScopeSet::Only(scopes.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScopeSet::Only(s) if s.is_empty())
    }

    pub fn insert(&mut self, scope: ChangeScope) {
        if let ScopeSet::Only(s) = self {
            s.insert(scope);
        }
    }

    /// Merge another set into this one. `All` absorbs everything.
    pub fn merge(&mut self, other: ScopeSet) {
        match (&mut *self, other) {
            (ScopeSet::All, _) => {}
            (this, ScopeSet::All) => *this = ScopeSet::All,
            (ScopeSet::Only(a), ScopeSet::Only(b)) => a.extend(b),
        }
    }

    pub fn contains(&self, scope: ChangeScope) -> bool {
        match self {
            ScopeSet::All => true,
            ScopeSet::Only(s) => s.contains(&scope),
        }
    }

    /// Whether a view depending on `deps` has to recompute.
    pub fn touches(&self, deps: &[ChangeScope]) -> bool {
        deps.iter().any(|d| self.contains(*d))
    }

    pub fn touches_filters(&self) -> bool {
        self.touches(&ChangeScope::FILTERS)
    }
}

/// Dataset event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Dataset events
pub mod events {
    use super::{Event, ScopeSet};

    /// A (possibly batched) change notification
    #[derive(Debug, Clone)]
    pub struct DatasetChanged {
        pub scopes: ScopeSet,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(DatasetChanged);
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Subscribe a typed closure
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event. Handlers must not publish on the same bus.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
