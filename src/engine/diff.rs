//! Generic item-set diff engine for non-ranked sources.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::DiffOutcome;
use crate::models::{
    EventKind, ItemSnapshot, SourceKind, StatePayload, StateRecord, WatchEvent,
};

/// Upper bound on remembered item ids per pair. Sources report a bounded
/// recent window, so ids older than this can never reappear in a snapshot.
pub const MAX_TRACKED_IDS: usize = 512;

/// Diffs a fresh item snapshot against the previous record for the pair.
///
/// An absent `previous` is the pair's first observation: every item is
/// recorded as seen but only kinds that are notable on first observation
/// produce events. Afterwards each unseen id produces exactly one event,
/// oldest first. A moved snapshot fingerprint with no new ids is reported
/// as a single `model_update` carrying the snapshot's head item.
pub fn diff_items(
    previous: Option<&StateRecord>,
    snapshot: &ItemSnapshot,
    entity: &str,
    entity_key: &str,
    source: SourceKind,
    now: DateTime<Utc>,
) -> DiffOutcome {
    let prev_seen: &[String] = previous
        .and_then(|record| record.payload.seen_ids())
        .unwrap_or(&[]);
    let first_observation = previous.is_none();

    let mut seen: HashSet<&str> = prev_seen.iter().map(String::as_str).collect();
    let mut new_items = Vec::new();
    for item in &snapshot.items {
        if seen.insert(&item.id) {
            new_items.push(item.clone());
        }
    }
    // Oldest first, so notifications read in the order things happened.
    new_items.sort_by_key(|item| item.timestamp);

    let mut events: Vec<WatchEvent> = new_items
        .iter()
        .filter(|item| !first_observation || item.kind.notable_on_first_observation())
        .map(|item| WatchEvent {
            kind: item.kind,
            entity: entity.to_string(),
            entity_key: entity_key.to_string(),
            source,
            item: item.clone(),
            detected_at: now,
        })
        .collect();

    let previous_fingerprint = previous.and_then(|r| r.fingerprint.as_deref());
    let fingerprint_moved = matches!(
        (previous_fingerprint, snapshot.fingerprint.as_deref()),
        (Some(prev), Some(current)) if prev != current
    );
    // A fingerprint that moved together with new ids is already explained
    // by those ids; only an unexplained move is an update.
    if fingerprint_moved && new_items.is_empty() {
        if let Some(head) = &snapshot.head {
            events.push(WatchEvent {
                kind: EventKind::ModelUpdate,
                entity: entity.to_string(),
                entity_key: entity_key.to_string(),
                source,
                item: head.clone(),
                detected_at: now,
            });
        }
    }

    let mut seen_ids: Vec<String> = prev_seen.to_vec();
    seen_ids.extend(new_items.iter().map(|item| item.id.clone()));
    if seen_ids.len() > MAX_TRACKED_IDS {
        seen_ids.drain(..seen_ids.len() - MAX_TRACKED_IDS);
    }

    let changed = !events.is_empty();
    let record = StateRecord {
        entity_key: entity_key.to_string(),
        fingerprint: snapshot
            .fingerprint
            .clone()
            .or_else(|| previous.and_then(|r| r.fingerprint.clone())),
        payload: StatePayload::Items { seen_ids },
        last_checked_at: now,
        last_changed_at: if changed {
            Some(now)
        } else {
            previous.and_then(|r| r.last_changed_at)
        },
    };

    DiffOutcome { events, record }
}
