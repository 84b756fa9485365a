//! Refresh scheduling and the live snapshot.

pub mod refresh;
pub mod snapshot;

pub use refresh::{
    CycleReport, CycleState, RefreshScheduler, RefreshSettings, SportFailure, SportFetch,
    SportHealth,
};
pub use snapshot::{Snapshot, SnapshotSink, SnapshotStore, TopOpportunityLogger};
