pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod store;
pub mod supabase;
pub(crate) mod utils;

pub use error::{ApiError, ProviderError};
