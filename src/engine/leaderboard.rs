//! Leaderboard diff engine: ranked-list comparison for one board.

use chrono::{DateTime, Utc};

use super::DiffOutcome;
use crate::models::{
    EventKind, Item, LeaderboardSnapshot, RankedEntry, ReleaseStage, SourceKind, StatePayload,
    StateRecord, WatchEvent,
};

fn board_url(board: &str) -> String {
    format!("https://artificialanalysis.ai/{board}")
}

fn entry_item(board: &str, entry: &RankedEntry, kind: EventKind, now: DateTime<Utc>) -> Item {
    Item {
        id: format!("{board}:{}", entry.id),
        fingerprint: format!("{}@{}", entry.id, entry.rank),
        kind,
        title: format!("{} entered {} at rank {}", entry.name, board, entry.rank),
        description: format!(
            "Creator: {}, score {:.0}",
            entry.creator.as_deref().unwrap_or("Unknown"),
            entry.score
        ),
        url: board_url(board),
        timestamp: now,
        stage: ReleaseStage::Unknown,
        extra: serde_json::json!({ "rank": entry.rank, "score": entry.score }),
    }
}

fn rank_change_item(
    board: &str,
    entry: &RankedEntry,
    previous_rank: u32,
    now: DateTime<Utc>,
) -> Item {
    let delta = previous_rank as i64 - entry.rank as i64;
    let direction = if delta > 0 { "up" } else { "down" };
    Item {
        id: format!("{board}:{}", entry.id),
        fingerprint: format!("{}@{}", entry.id, entry.rank),
        kind: EventKind::LeaderboardRankChange,
        title: format!(
            "{} moved {direction} on {}: rank {} -> {}",
            entry.name, board, previous_rank, entry.rank
        ),
        description: format!(
            "Creator: {}, score {:.0}",
            entry.creator.as_deref().unwrap_or("Unknown"),
            entry.score
        ),
        url: board_url(board),
        timestamp: now,
        stage: ReleaseStage::Unknown,
        extra: serde_json::json!({
            "previous_rank": previous_rank,
            "new_rank": entry.rank,
            "delta": delta,
        }),
    }
}

fn top3_item(
    board: &str,
    previous: &LeaderboardSnapshot,
    current: &LeaderboardSnapshot,
    now: DateTime<Utc>,
) -> Item {
    let podium = |snapshot: &LeaderboardSnapshot| -> Vec<String> {
        snapshot.top3().iter().map(|e| format!("{}. {}", e.rank, e.name)).collect()
    };
    let was = podium(previous);
    let is_now = podium(current);
    Item {
        id: format!("{board}:top3"),
        fingerprint: is_now.join("|"),
        kind: EventKind::LeaderboardTop3Change,
        title: format!("Top 3 changed on {board}"),
        description: format!("Now: {}. Was: {}", is_now.join(", "), was.join(", ")),
        url: board_url(board),
        timestamp: now,
        stage: ReleaseStage::Unknown,
        extra: serde_json::json!({ "previous": was, "current": is_now }),
    }
}

/// Diffs a fresh ranked list against the previous record for the board.
///
/// The first observation of a board produces no events. Afterwards, per
/// model, entering the tracked window and moving within it are mutually
/// exclusive: an entering model produces one `leaderboard_new_entry` and no
/// rank-change event. Top-3 comparison is by membership only, so reorders
/// within an unchanged podium stay quiet. The stored payload is always
/// replaced with the fresh list, including when nothing changed.
pub fn diff_board(
    previous: Option<&StateRecord>,
    current: &LeaderboardSnapshot,
    entity_key: &str,
    now: DateTime<Utc>,
) -> DiffOutcome {
    let previous_board = previous.and_then(|record| record.payload.ranked());

    let mut events = Vec::new();
    if let Some(previous_board) = previous_board {
        let event = |item: Item| WatchEvent {
            kind: item.kind,
            entity: current.board.clone(),
            entity_key: entity_key.to_string(),
            source: SourceKind::Leaderboard,
            item,
            detected_at: now,
        };

        let mut entries = Vec::new();
        let mut rank_changes = Vec::new();
        for entry in &current.entries {
            match previous_board.entry(&entry.id) {
                None => entries.push(event(entry_item(
                    &current.board,
                    entry,
                    EventKind::LeaderboardNewEntry,
                    now,
                ))),
                Some(prev) if prev.rank != entry.rank => rank_changes.push(event(
                    rank_change_item(&current.board, entry, prev.rank, now),
                )),
                Some(_) => {}
            }
        }
        events.extend(entries);
        events.extend(rank_changes);

        let mut previous_top3: Vec<&str> =
            previous_board.top3().iter().map(|e| e.id.as_str()).collect();
        let mut current_top3: Vec<&str> = current.top3().iter().map(|e| e.id.as_str()).collect();
        previous_top3.sort_unstable();
        current_top3.sort_unstable();
        if previous_top3 != current_top3 {
            events.push(event(top3_item(&current.board, previous_board, current, now)));
        }
    }

    let changed = !events.is_empty();
    let record = StateRecord {
        entity_key: entity_key.to_string(),
        fingerprint: None,
        payload: StatePayload::Ranked(current.clone()),
        last_checked_at: now,
        last_changed_at: if changed {
            Some(now)
        } else {
            previous.and_then(|r| r.last_changed_at)
        },
    };

    DiffOutcome { events, record }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{board, ranked_entry, ts};

    const KEY: &str = "leaderboard:text-to-image";

    fn record_with(previous: LeaderboardSnapshot) -> StateRecord {
        StateRecord {
            entity_key: KEY.to_string(),
            fingerprint: None,
            payload: StatePayload::Ranked(previous),
            last_checked_at: ts(-60),
            last_changed_at: None,
        }
    }

    fn diff(previous: Option<&StateRecord>, current: &LeaderboardSnapshot) -> DiffOutcome {
        diff_board(previous, current, KEY, ts(0))
    }

    #[test]
    fn first_observation_stores_the_board_without_events() {
        let current = board("text-to-image", vec![ranked_entry("m1", 1, 1200.0)]);

        let outcome = diff(None, &current);

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.record.payload.ranked(), Some(&current));
        assert_eq!(outcome.record.last_changed_at, None);
    }

    #[test]
    fn entering_the_window_outside_top3_is_one_entry_event() {
        let previous = record_with(board(
            "text-to-image",
            vec![ranked_entry("m1", 1, 1200.0), ranked_entry("m2", 2, 1100.0)],
        ));
        let current = board(
            "text-to-image",
            vec![
                ranked_entry("m1", 1, 1200.0),
                ranked_entry("m2", 2, 1100.0),
                ranked_entry("m5", 5, 900.0),
            ],
        );

        let outcome = diff(Some(&previous), &current);

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, EventKind::LeaderboardNewEntry);
        assert_eq!(outcome.events[0].item.id, "text-to-image:m5");
    }

    #[test]
    fn rank_change_reports_signed_delta() {
        let previous = record_with(board(
            "text-to-image",
            vec![ranked_entry("m1", 4, 1000.0), ranked_entry("m2", 5, 990.0)],
        ));
        let current = board(
            "text-to-image",
            vec![ranked_entry("m1", 6, 980.0), ranked_entry("m2", 5, 990.0)],
        );

        let outcome = diff(Some(&previous), &current);

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.kind, EventKind::LeaderboardRankChange);
        assert_eq!(event.item.extra["delta"], serde_json::json!(-2));
        assert!(event.item.title.contains("moved down"));
    }

    #[test]
    fn podium_reorder_without_membership_change_is_quiet() {
        let previous = record_with(board(
            "text-to-image",
            vec![
                ranked_entry("m1", 1, 1200.0),
                ranked_entry("m2", 2, 1150.0),
                ranked_entry("m3", 3, 1100.0),
            ],
        ));
        let current = board(
            "text-to-image",
            vec![
                ranked_entry("m2", 1, 1210.0),
                ranked_entry("m1", 2, 1190.0),
                ranked_entry("m3", 3, 1100.0),
            ],
        );

        let outcome = diff(Some(&previous), &current);

        // Two rank changes, but the podium membership is unchanged.
        let kinds: Vec<EventKind> = outcome.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::LeaderboardRankChange, EventKind::LeaderboardRankChange]
        );
    }

    #[test]
    fn podium_membership_change_is_one_event() {
        let previous = record_with(board(
            "text-to-image",
            vec![
                ranked_entry("m1", 1, 1200.0),
                ranked_entry("m2", 2, 1150.0),
                ranked_entry("m3", 3, 1100.0),
                ranked_entry("m4", 4, 1050.0),
            ],
        ));
        let current = board(
            "text-to-image",
            vec![
                ranked_entry("m1", 1, 1200.0),
                ranked_entry("m2", 2, 1150.0),
                ranked_entry("m4", 3, 1120.0),
                ranked_entry("m3", 4, 1100.0),
            ],
        );

        let outcome = diff(Some(&previous), &current);

        let kinds: Vec<EventKind> = outcome.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::LeaderboardRankChange,
                EventKind::LeaderboardRankChange,
                EventKind::LeaderboardTop3Change,
            ]
        );
    }

    #[test]
    fn entry_into_top3_orders_entry_before_podium_event() {
        let previous = record_with(board(
            "text-to-image",
            vec![ranked_entry("m1", 1, 1200.0), ranked_entry("m2", 2, 1150.0)],
        ));
        let current = board(
            "text-to-image",
            vec![
                ranked_entry("m1", 1, 1200.0),
                ranked_entry("new", 2, 1180.0),
                ranked_entry("m2", 3, 1150.0),
            ],
        );

        let outcome = diff(Some(&previous), &current);

        let kinds: Vec<EventKind> = outcome.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::LeaderboardNewEntry,
                EventKind::LeaderboardRankChange,
                EventKind::LeaderboardTop3Change,
            ]
        );
        // The entering model gets no rank-change event of its own.
        assert!(outcome
            .events
            .iter()
            .filter(|e| e.kind == EventKind::LeaderboardRankChange)
            .all(|e| e.item.id == "text-to-image:m2"));
    }

    #[test]
    fn unchanged_board_replaces_payload_and_keeps_changed_at() {
        let snapshot = board("text-to-image", vec![ranked_entry("m1", 1, 1200.0)]);
        let mut previous = record_with(snapshot.clone());
        previous.last_changed_at = Some(ts(-30));

        let outcome = diff(Some(&previous), &snapshot);

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.record.payload.ranked(), Some(&snapshot));
        assert_eq!(outcome.record.last_changed_at, Some(ts(-30)));
        assert_eq!(outcome.record.last_checked_at, ts(0));
    }
}
