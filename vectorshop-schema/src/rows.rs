//! Typed views of the Provider rows the service has to reason about.
//!
//! Only the columns read by business rules are named; everything else is kept
//! in `extra` so nothing is lost when a row is echoed back to a client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Primary/foreign key as stored by the Provider: UUID text or a bigint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RowId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Text(s) => f.write_str(s),
            RowId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId::Text(value)
    }
}

/// `users` row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserRow {
    pub id: RowId,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub points: Option<i64>,

    #[serde(default)]
    pub display_id: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `temporary_leaderboard` row (walk-in players without an account).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemporaryLeaderboardRow {
    pub id: RowId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub exp_points: Option<i64>,

    #[serde(default)]
    pub display_id: Value,

    #[serde(default)]
    pub class: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `my_cart` row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartRow {
    pub id: RowId,

    #[serde(default)]
    pub buy_quantity: Option<i64>,

    #[serde(default)]
    pub point_reward: Option<i64>,

    #[serde(default)]
    pub exp_reward: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Projection of `product_variants` copied into a new cart row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariantRow {
    #[serde(default)]
    pub variant_type: Value,

    #[serde(default)]
    pub variant_name: Value,

    #[serde(default)]
    pub variant_thumbnail: Value,

    #[serde(default)]
    pub price: Value,

    #[serde(default)]
    pub point_reward: Option<i64>,

    #[serde(default)]
    pub exp_reward: Option<i64>,
}

/// `notifications` row as delivered by change-data-capture.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationRow {
    pub id: Value,

    #[serde(default)]
    pub send_to_user_id: Option<String>,

    #[serde(default)]
    pub notif_type: Option<String>,

    #[serde(default)]
    pub notif_title: Option<String>,

    #[serde(default)]
    pub notif_contents: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductThumbnailRow {
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}
