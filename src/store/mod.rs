//! Storefront rules layered on top of the backend tables.

pub mod cart;
pub mod catalog;
pub mod leaderboard;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod progress;

pub const ADDRESSES_TABLE: &str = "user_address";
pub const ADDRESS_USED: &str = "USED";
pub const ADDRESS_UNUSED: &str = "UNUSED";
