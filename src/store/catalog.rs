use serde::Deserialize;
use serde_json::Value;

pub const SERVICES_TABLE: &str = "services";
pub const BANNERS_TABLE: &str = "banners";
pub const PAYMENT_METHODS_TABLE: &str = "payment_method";

pub const SERVICE_COLUMNS: &str = "id,service_name,description,service_features,thumbnail_url,\
price_calculation,category,exp_reward,point_reward,created_at";

#[derive(Debug, Deserialize)]
pub struct CategoryRow {
    #[serde(default)]
    pub category: Value,
}

/// Distinct categories, keeping the order they arrived in.
pub fn distinct_categories(rows: Vec<CategoryRow>) -> Vec<Value> {
    let mut seen = Vec::new();
    for row in rows {
        if !row.category.is_null() && !seen.contains(&row.category) {
            seen.push(row.category);
        }
    }
    seen
}
