//! Brush link contract: how one highlight round reaches every view

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ids::{IdSet, PlaceId, ReligionId, SourceId, TagId, TupleId};

/// Monotonic sequence number of a brush round
pub type BrushRound = u64;

/// One link invocation. `ids: None` means "nothing selected".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushUpdate<T> {
    pub round: BrushRound,
    pub ids: Option<T>,
}

impl<T> BrushUpdate<T> {
    pub fn clear(round: BrushRound) -> Self {
        Self { round, ids: None }
    }

    pub fn is_clear(&self) -> bool {
        self.ids.is_none()
    }
}

/// A view's asynchronous brush callback
#[async_trait]
pub trait BrushLink<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn link(&self, update: BrushUpdate<T>) -> anyhow::Result<()>;
}

/// Link used until a consumer registers
pub struct NoopLink;

#[async_trait]
impl<T: Send + 'static> BrushLink<T> for NoopLink {
    async fn link(&self, _update: BrushUpdate<T>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The seven link slots
#[derive(Clone)]
pub struct BrushLinks {
    pub location_list: Arc<dyn BrushLink<IdSet<PlaceId>>>,
    pub map: Arc<dyn BrushLink<IdSet<PlaceId>>>,
    pub untimed: Arc<dyn BrushLink<IdSet<TupleId>>>,
    pub timeline: Arc<dyn BrushLink<IdSet<TupleId>>>,
    pub hierarchy: Arc<dyn BrushLink<IdSet<ReligionId>>>,
    pub sources: Arc<dyn BrushLink<IdSet<SourceId>>>,
    pub tags: Arc<dyn BrushLink<IdSet<TagId>>>,
}

impl Default for BrushLinks {
    fn default() -> Self {
        Self {
            location_list: Arc::new(NoopLink),
            map: Arc::new(NoopLink),
            untimed: Arc::new(NoopLink),
            timeline: Arc::new(NoopLink),
            hierarchy: Arc::new(NoopLink),
            sources: Arc::new(NoopLink),
            tags: Arc::new(NoopLink),
        }
    }
}

/// Fully resolved selection for one round, one entry per link slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrushFanout {
    pub location_list: Option<IdSet<PlaceId>>,
    pub map: Option<IdSet<PlaceId>>,
    pub untimed: Option<IdSet<TupleId>>,
    pub timeline: Option<IdSet<TupleId>>,
    pub hierarchy: Option<IdSet<ReligionId>>,
    pub sources: Option<IdSet<SourceId>>,
    pub tags: Option<IdSet<TagId>>,
}

impl BrushFanout {
    /// Every slot receives `None`
    pub fn cleared() -> Self {
        Self::default()
    }
}

impl BrushLinks {
    /// Invoke all seven links concurrently and wait until every one settled.
    ///
    /// Failures are logged and counted, never propagated to siblings.
    pub async fn dispatch(&self, round: BrushRound, fanout: BrushFanout) -> usize {
        let (a, b, c, d, e, f, g) = tokio::join!(
            self.location_list.link(BrushUpdate { round, ids: fanout.location_list }),
            self.map.link(BrushUpdate { round, ids: fanout.map }),
            self.untimed.link(BrushUpdate { round, ids: fanout.untimed }),
            self.timeline.link(BrushUpdate { round, ids: fanout.timeline }),
            self.hierarchy.link(BrushUpdate { round, ids: fanout.hierarchy }),
            self.sources.link(BrushUpdate { round, ids: fanout.sources }),
            self.tags.link(BrushUpdate { round, ids: fanout.tags }),
        );

        let mut failures = 0;
        for (slot, result) in [
            ("location-list", a),
            ("map", b),
            ("untimed", c),
            ("timeline", d),
            ("hierarchy", e),
            ("sources", f),
            ("tags", g),
        ] {
            if let Err(err) = result {
                warn!(round, slot, "brush link failed: {err:#}");
                failures += 1;
            }
        }
        debug!(round, failures, "brush round settled");
        failures
    }
}

/// Hands out brush round numbers
#[derive(Debug, Default)]
pub struct RoundCounter {
    next: AtomicU64,
}

impl RoundCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> BrushRound {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// View-side guard that rejects updates from superseded rounds
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundGate {
    last: Option<BrushRound>,
}

impl RoundGate {
    /// Accept `round` if it is not older than the last accepted one
    pub fn accept(&mut self, round: BrushRound) -> bool {
        match self.last {
            Some(last) if round < last => false,
            _ => {
                self.last = Some(round);
                true
            }
        }
    }

    pub fn last(&self) -> Option<BrushRound> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recording<T> {
        seen: Mutex<Vec<BrushUpdate<T>>>,
    }

    #[async_trait]
    impl<T: Send + Sync + 'static> BrushLink<T> for Recording<T> {
        async fn link(&self, update: BrushUpdate<T>) -> anyhow::Result<()> {
            self.seen.lock().push(update);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl<T: Send + 'static> BrushLink<T> for Failing {
        async fn link(&self, _update: BrushUpdate<T>) -> anyhow::Result<()> {
            anyhow::bail!("view went away")
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_block_siblings() {
        let tags = Arc::new(Recording { seen: Mutex::new(Vec::new()) });
        let links = BrushLinks {
            map: Arc::new(Failing),
            timeline: Arc::new(Failing),
            tags: tags.clone(),
            ..BrushLinks::default()
        };

        let fanout = BrushFanout {
            tags: Some(IdSet::from([4, 5])),
            ..BrushFanout::default()
        };
        assert_eq!(links.dispatch(3, fanout).await, 2);
        assert_eq!(
            tags.seen.lock().as_slice(),
            &[BrushUpdate { round: 3, ids: Some(IdSet::from([4, 5])) }]
        );
    }

    #[test]
    fn test_round_gate_drops_stale() {
        let mut gate = RoundGate::default();
        assert!(gate.accept(2));
        assert!(!gate.accept(1));
        assert!(gate.accept(2));
        assert!(gate.accept(5));
        assert_eq!(gate.last(), Some(5));
    }

    #[test]
    fn test_round_counter() {
        let counter = RoundCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }
}
