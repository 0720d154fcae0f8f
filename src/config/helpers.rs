//! Serde helpers shared by configuration structs.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Deserializes a `Duration` from a number of hours.
pub fn deserialize_duration_from_hours<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let hours = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(hours * 3600))
}

/// Deserializes a `Duration` from a number of seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(seconds))
}
