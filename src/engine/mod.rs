//! Change detection and routing.
//!
//! The engines are pure functions from `(previous state, fresh snapshot)` to
//! `(events, next state)`. They never perform I/O, which is what makes the
//! scheduler's at-least-once contract easy to state: events are delivered
//! first, the returned record is committed after.

pub mod diff;
pub mod leaderboard;
pub mod router;

use crate::models::{StateRecord, WatchEvent};

/// What a diff engine computed for one entity/source pair: the events to
/// deliver and the record to persist once delivery is done.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Events to deliver, oldest first.
    pub events: Vec<WatchEvent>,

    /// The next durable state for the pair.
    pub record: StateRecord,
}
