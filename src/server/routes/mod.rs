pub mod account;
pub mod addresses;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod leaderboard;
pub mod notifications;
pub mod orders;
pub mod pages;
pub mod products;
pub mod ws;
