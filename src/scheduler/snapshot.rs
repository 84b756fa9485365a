//! Live snapshot store shared between the scheduler and consumers.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::arbitrage::Opportunity;
use crate::error::SchedulerError;
use crate::utils::round_for_display;

/// Ranked opportunities as of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Cycle that produced this snapshot; 0 before the first cycle.
    pub cycle: u64,
    /// When the snapshot was published.
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// Opportunities in ranked order.
    pub opportunities: Vec<Opportunity>,
}

impl Snapshot {
    /// Placeholder served until the first cycle publishes.
    pub fn initial() -> Self {
        Self {
            cycle: 0,
            published_at: OffsetDateTime::now_utc(),
            opportunities: Vec::new(),
        }
    }

    /// True until a cycle has published.
    pub fn is_initial(&self) -> bool {
        self.cycle == 0
    }
}

/// Push notification hook for snapshot consumers.
pub trait SnapshotSink: Send + Sync {
    /// Called once per published snapshot, in publish order.
    fn on_snapshot_published(&self, snapshot: &Arc<Snapshot>);
}

/// Holder of the live snapshot.
///
/// Snapshots are immutable once published. Publishing swaps in a new `Arc`,
/// so a reader holding the previous one keeps a consistent view.
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
    sinks: RwLock<Vec<Arc<dyn SnapshotSink>>>,
}

impl SnapshotStore {
    /// Create a store holding the initial empty snapshot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::initial()));
        Self {
            tx,
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// The live snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Receiver that sees the live snapshot now and every later one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Register a push consumer.
    pub fn add_sink(&self, sink: Arc<dyn SnapshotSink>) -> Result<(), SchedulerError> {
        self.sinks
            .write()
            .map_err(|_| SchedulerError::LockPoisoned("snapshot sinks"))?
            .push(sink);
        Ok(())
    }

    /// Replace the live snapshot and notify sinks.
    ///
    /// On error nothing is published and the previous snapshot stays live.
    pub fn publish(&self, opportunities: Vec<Opportunity>) -> Result<Arc<Snapshot>, SchedulerError> {
        let sinks = self
            .sinks
            .read()
            .map_err(|_| SchedulerError::LockPoisoned("snapshot sinks"))?;

        let mut published = None;
        self.tx.send_modify(|live| {
            let next = Arc::new(Snapshot {
                cycle: live.cycle + 1,
                published_at: OffsetDateTime::now_utc(),
                opportunities,
            });
            published = Some(next.clone());
            *live = next;
        });
        let snapshot = published.unwrap_or_else(|| self.current());

        debug!(cycle = snapshot.cycle, sinks = sinks.len(), "Snapshot published");
        for sink in sinks.iter() {
            sink.on_snapshot_published(&snapshot);
        }

        Ok(snapshot)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink that logs the best opportunity of each snapshot.
#[derive(Debug, Default)]
pub struct TopOpportunityLogger;

impl SnapshotSink for TopOpportunityLogger {
    fn on_snapshot_published(&self, snapshot: &Arc<Snapshot>) {
        match snapshot.opportunities.first() {
            Some(top) => info!(
                cycle = snapshot.cycle,
                count = snapshot.opportunities.len(),
                "Top: {} vs {} | {} {} @ {} / {} {} @ {} | margin {}% profit {}%",
                top.home_team,
                top.away_team,
                top.outcome_a.outcome,
                top.outcome_a.price,
                top.outcome_a.bookmaker,
                top.outcome_b.outcome,
                top.outcome_b.price,
                top.outcome_b.bookmaker,
                round_for_display(top.margin_percent),
                round_for_display(top.profit_percent),
            ),
            None => debug!(cycle = snapshot.cycle, "Snapshot has no opportunities"),
        }
    }
}
