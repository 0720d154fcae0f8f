//! Pure event-to-channel routing.

use std::collections::{HashMap, HashSet};

use crate::config::AppConfig;
use crate::models::{EventKind, WatchEvent};

/// Where one event goes: a named channel and whether to mention everyone in
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Channel name resolved by the notifier to a concrete webhook.
    pub channel: String,

    /// Whether the notification should mention the channel.
    pub mention: bool,
}

/// Routes events to channels from the static configuration. Routing is pure
/// lookup, so it is resolved before delivery and never fails.
pub struct EventRouter {
    routing: HashMap<EventKind, String>,
    mention_for: HashSet<EventKind>,
    mention_entities: HashSet<String>,
}

impl EventRouter {
    /// The catch-all channel for kinds without an explicit route.
    pub const DEFAULT_CHANNEL: &'static str = "default";

    /// Builds a router from the routing tables and priority overrides. An
    /// entity forces mentions when it is a priority model, unless an
    /// explicit `priority_models` override disables the mention (the
    /// override wins over the priority tier).
    pub fn new(config: &AppConfig) -> Self {
        let mention_entities: HashSet<String> = config
            .models
            .iter()
            .map(|model| model.name.as_str())
            .chain(config.priority_models.iter().map(|pm| pm.name.as_str()))
            .filter(|name| config.is_priority_model(name))
            .filter(|name| config.priority_config(name).map_or(true, |pm| pm.mention_channel))
            .map(str::to_lowercase)
            .collect();

        Self {
            routing: config.notifications.event_routing.clone(),
            mention_for: config.notifications.mention_channel_for.iter().copied().collect(),
            mention_entities,
        }
    }

    /// Resolves the channel and mention flag for one event. The mention flag
    /// is the union of the kind-based list and per-entity priority
    /// overrides.
    pub fn route(&self, event: &WatchEvent) -> Route {
        let channel = self
            .routing
            .get(&event.kind)
            .cloned()
            .unwrap_or_else(|| Self::DEFAULT_CHANNEL.to_string());
        let mention = self.mention_for.contains(&event.kind)
            || self.mention_entities.contains(&event.entity.to_lowercase());
        Route { channel, mention }
    }
}
