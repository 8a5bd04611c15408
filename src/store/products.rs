pub const TABLE: &str = "products";
pub const VARIANTS_TABLE: &str = "product_variants";

/// Hyphenated 8-4-4-4-12 hex form, either case. Braced, URN and simple forms are refused.
pub fn is_product_id(raw: &str) -> bool {
    raw.len() == 36 && uuid::Uuid::try_parse(raw).is_ok()
}
