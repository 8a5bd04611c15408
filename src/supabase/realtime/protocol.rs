//! Phoenix channel frames (`vsn=1.0.0`) as spoken by the Realtime server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const PHOENIX_TOPIC: &str = "phoenix";

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub join_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChangeEvent {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "*")]
    All,
}

/// One `postgres_changes` binding of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeFilter {
    pub event: ChangeEvent,
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ChangeFilter {
    pub fn new(event: ChangeEvent, table: &str) -> Self {
        Self {
            event,
            schema: "public".to_string(),
            table: table.to_string(),
            filter: None,
        }
    }

    pub fn inserts(table: &str) -> Self {
        Self::new(ChangeEvent::Insert, table)
    }

    pub fn all(table: &str) -> Self {
        Self::new(ChangeEvent::All, table)
    }

    /// Row filter in PostgREST syntax, e.g. `send_to_user_id=eq.<uuid>`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// A row change delivered on a joined channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub table: String,
    pub kind: ChangeEvent,
    pub record: Map<String, Value>,
    pub old_record: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Change(ChangeRecord),
    JoinOk,
    JoinError(String),
    Closed(String),
    Ignored,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(default)]
    table: String,
    #[serde(rename = "type", alias = "eventType")]
    kind: ChangeEvent,
    #[serde(default)]
    record: Option<Map<String, Value>>,
    #[serde(default)]
    old_record: Option<Map<String, Value>>,
}

pub fn topic(channel: &str) -> String {
    format!("realtime:{channel}")
}

pub fn join(topic: &str, filters: &[ChangeFilter], access_token: &str, reference: u64) -> PhoenixMessage {
    let reference = reference.to_string();
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_JOIN.to_string(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": filters,
                "private": false,
            },
            "access_token": access_token,
        }),
        reference: Some(reference.clone()),
        join_ref: Some(reference),
    }
}

pub fn heartbeat(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: EVENT_HEARTBEAT.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: None,
    }
}

pub fn leave(topic: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_LEAVE.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: None,
    }
}

/// Interprets a frame received for `topic`. `join_ref` is the reference of our
/// outstanding join, if any.
pub fn classify(msg: PhoenixMessage, topic: &str, join_ref: Option<&str>) -> Inbound {
    if msg.topic != topic {
        return Inbound::Ignored;
    }

    match msg.event.as_str() {
        EVENT_POSTGRES_CHANGES => {
            let Some(data) = msg.payload.get("data").cloned() else {
                return Inbound::Ignored;
            };
            match serde_json::from_value::<ChangeData>(data) {
                Ok(data) => Inbound::Change(ChangeRecord {
                    table: data.table,
                    kind: data.kind,
                    record: data.record.unwrap_or_default(),
                    old_record: data.old_record.unwrap_or_default(),
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "Undecodable change payload");
                    Inbound::Ignored
                }
            }
        }
        EVENT_REPLY if join_ref.is_some() && msg.reference.as_deref() == join_ref => {
            match msg.payload.get("status").and_then(Value::as_str) {
                Some("ok") => Inbound::JoinOk,
                _ => Inbound::JoinError(
                    msg.payload
                        .get("response")
                        .map(Value::to_string)
                        .unwrap_or_else(|| "join refused".to_string()),
                ),
            }
        }
        EVENT_CLOSE | EVENT_ERROR => Inbound::Closed(msg.event),
        _ => Inbound::Ignored,
    }
}
