mod api;
mod provider;
mod relay;

pub use api::ApiError;
pub use provider::{AuthErrorBody, ProviderError, RestErrorBody};
pub use relay::RelayError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
