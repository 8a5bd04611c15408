use serde::Serialize;
use serde_json::{Map, Value};
use vectorshop_schema::{NotificationPayload, NotificationRow, ProductThumbnailRow, RelayEvent};

use crate::supabase::SupabaseClient;

pub const TABLE: &str = "notifications";
pub const STATUS_READ: &str = "READ";
pub const STATUS_UNREAD: &str = "UNREAD";

const KIND_ORDER: &str = "ORDER";
const KIND_PRODUCT: &str = "PRODUCT";
const PRODUCT_MARKER: &str = "product_id:";

/// Row inserted into `notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNotification {
    pub send_to_user_id: String,
    pub notif_type: &'static str,
    pub notif_title: &'static str,
    pub notif_contents: String,
    pub status: &'static str,
}

impl NewNotification {
    fn order(user_id: &str, title: &'static str, contents: String) -> Self {
        Self {
            send_to_user_id: user_id.to_string(),
            notif_type: KIND_ORDER,
            notif_title: title,
            notif_contents: contents,
            status: STATUS_UNREAD,
        }
    }

    pub fn order_received(user_id: &str, order_id: &Value) -> Self {
        let id = match order_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::order(
            user_id,
            "Order Received",
            format!("Your order #{id} has been received and is being processed."),
        )
    }

    pub fn orders_received(user_id: &str, count: usize) -> Self {
        Self::order(
            user_id,
            "Orders Received",
            format!("Your {count} orders have been received and are being processed."),
        )
    }
}

/// First `product_id:<token>` mentioned in a notification text.
pub fn product_reference(contents: &str) -> Option<&str> {
    contents.match_indices(PRODUCT_MARKER).find_map(|(at, marker)| {
        let rest = &contents[at + marker.len()..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    })
}

pub fn payload(row: NotificationRow, thumbnail: Option<String>) -> NotificationPayload {
    NotificationPayload {
        id: row.id,
        kind: row.notif_type,
        title: row.notif_title,
        content: row.notif_contents,
        thumbnail,
        timestamp: row.created_at,
    }
}

/// Turns an inserted `notifications` row into the event pushed to its owner.
/// Product notifications get the referenced product's thumbnail; a failed
/// lookup only loses the picture.
pub async fn to_event(
    client: &SupabaseClient,
    record: Map<String, Value>,
) -> Result<RelayEvent, serde_json::Error> {
    let row: NotificationRow = serde_json::from_value(Value::Object(record))?;

    let product = match row.notif_type.as_deref() {
        Some(KIND_PRODUCT) => row.notif_contents.as_deref().and_then(product_reference),
        _ => None,
    };

    let mut thumbnail = None;
    if let Some(product_id) = product {
        match client
            .from("products")
            .select("thumbnail_url")
            .eq("id", product_id)
            .fetch_optional::<ProductThumbnailRow>()
            .await
        {
            Ok(found) => thumbnail = found.and_then(|p| p.thumbnail_url),
            Err(e) => {
                tracing::warn!(product_id, error = %e, "Notification thumbnail lookup failed");
            }
        }
    }

    Ok(RelayEvent::NewNotification(payload(row, thumbnail)))
}
