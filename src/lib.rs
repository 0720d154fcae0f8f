#![warn(missing_docs)]
//! Modelwatch polls source-control hosts, model hubs, paper and news feeds
//! and ranked leaderboards for AI model releases, diffs each poll against
//! durable state, and notifies Slack about what actually changed.

pub mod config;
pub mod engine;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod sources;
pub mod supervisor;
pub mod test_helpers;
