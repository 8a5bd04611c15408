use crate::rows::RowId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignupRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub gender: Value,
    #[serde(default)]
    pub birth_date: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddToCartRequest {
    pub product_id: RowId,
    pub variant_id: RowId,
    pub buy_quantity: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateCartRequest {
    pub buy_quantity: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeleteCartItemsRequest {
    #[serde(rename = "itemIds")]
    pub item_ids: Vec<RowId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewAddressRequest {
    #[serde(default)]
    pub alamat_lengkap: Value,
    #[serde(default)]
    pub patokan: Value,
    #[serde(default)]
    pub jenis_alamat: Value,
}

/// Checkout of several orders at once. Each order is forwarded as-is apart
/// from the server-owned columns (`user_id`, `created_at`, `status`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkOrderRequest {
    pub orders: Vec<Map<String, Value>>,
    #[serde(rename = "cartItemIds", default)]
    pub cart_item_ids: Vec<RowId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdjustExpRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub display_id: Option<RowId>,
    #[serde(default)]
    pub exp_amount: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdjustPointsRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub points_amount: Option<i64>,
}
