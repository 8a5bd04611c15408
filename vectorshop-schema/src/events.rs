//! Frames pushed to browser clients over `/ws`, shaped `{"type": ..., "data": ...}`.

use crate::rows::RowId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    NewNotification(NotificationPayload),
    LeaderboardUpdate(Vec<LeaderboardEntry>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationPayload {
    pub id: Value,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub thumbnail: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSource {
    Temporary,
    User,
}

/// One leaderboard line. Temporary players carry `class` and never `points`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub id: RowId,
    pub name: Option<String>,
    pub exp: Option<i64>,
    pub display_id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<Value>,
    pub points: Option<i64>,
    pub source: LeaderboardSource,
}
