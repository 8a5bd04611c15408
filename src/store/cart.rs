use serde::Serialize;
use serde_json::Value;
use vectorshop_schema::{AddToCartRequest, CartRow, RowId, VariantRow};

pub const TABLE: &str = "my_cart";

/// Cart listing with the product name and picture embedded.
pub const ITEMS_WITH_PRODUCT: &str = "*,products:product_id(name,thumbnail_url)";

/// Columns of `product_variants` copied onto a new cart line.
pub const VARIANT_COLUMNS: &str =
    "variant_type,variant_name,variant_thumbnail,price,point_reward,exp_reward";

/// Reward earned by one unit of a line, rounded down.
pub fn per_unit(total: i64, quantity: i64) -> i64 {
    if quantity <= 0 {
        return 0;
    }
    total.div_euclid(quantity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantityPatch {
    pub buy_quantity: i64,
    pub point_reward: i64,
    pub exp_reward: i64,
}

/// Quantity of an existing line after `added` more units. `None` on overflow.
pub fn grown_quantity(row: &CartRow, added: i64) -> Option<i64> {
    row.buy_quantity.unwrap_or(0).checked_add(added)
}

/// New quantity for an existing line, with both rewards scaled from the line's
/// current per-unit value. `None` when a reward does not fit in an `i64`.
pub fn rescale(row: &CartRow, quantity: i64) -> Option<QuantityPatch> {
    let held = row.buy_quantity.unwrap_or(0);
    Some(QuantityPatch {
        buy_quantity: quantity,
        point_reward: per_unit(row.point_reward.unwrap_or(0), held).checked_mul(quantity)?,
        exp_reward: per_unit(row.exp_reward.unwrap_or(0), held).checked_mul(quantity)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCartLine<'a> {
    pub user_id: &'a str,
    pub product_id: &'a RowId,
    pub variant_id: &'a RowId,
    pub cart_variant_type: &'a Value,
    pub cart_variant_name: &'a Value,
    pub cart_variant_thumbnail: &'a Value,
    pub buy_quantity: i64,
    pub price: &'a Value,
    pub point_reward: i64,
    pub exp_reward: i64,
}

/// A fresh cart line snapshotting the variant's labels and price. `None` when a
/// reward does not fit in an `i64`.
pub fn new_line<'a>(
    user_id: &'a str,
    req: &'a AddToCartRequest,
    variant: &'a VariantRow,
) -> Option<NewCartLine<'a>> {
    Some(NewCartLine {
        user_id,
        product_id: &req.product_id,
        variant_id: &req.variant_id,
        cart_variant_type: &variant.variant_type,
        cart_variant_name: &variant.variant_name,
        cart_variant_thumbnail: &variant.variant_thumbnail,
        buy_quantity: req.buy_quantity,
        price: &variant.price,
        point_reward: variant.point_reward.unwrap_or(0).checked_mul(req.buy_quantity)?,
        exp_reward: variant.exp_reward.unwrap_or(0).checked_mul(req.buy_quantity)?,
    })
}
