//! Core data model for the watcher: entities, snapshots, events and
//! persisted state records.

pub mod entity;
pub mod event;
pub mod snapshot;
pub mod state_record;

pub use entity::{PriorityTier, WatchedEntity};
pub use event::{EventKind, ReleaseStage, WatchEvent};
pub use snapshot::{Item, ItemSnapshot, LeaderboardSnapshot, RankedEntry, Snapshot, SourceKind};
pub use state_record::{StatePayload, StateRecord};
