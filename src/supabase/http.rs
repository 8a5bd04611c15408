use backon::{ExponentialBuilder, Retryable};
use reqwest::{
    RequestBuilder, Response,
    header::{CONNECTION, HeaderMap, HeaderValue},
};
use std::time::Duration;
use url::Url;

use crate::error::{AuthErrorBody, IsRetryable, ProviderError, RestErrorBody};
use crate::utils::logging::body_preview;

const USER_AGENT: &str = concat!("vectorshop/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client: `apikey` on every call, bounded timeouts, optional proxy.
pub(super) fn build_client(
    anon_key: &str,
    proxy: Option<Url>,
    enable_multiplexing: bool,
) -> Result<reqwest::Client, ProviderError> {
    let mut headers = HeaderMap::new();
    let apikey = HeaderValue::from_str(anon_key)
        .map_err(|_| ProviderError::Config("supabase.anon_key"))?;
    headers.insert("apikey", apikey);

    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30));

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if !enable_multiplexing {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    } else {
        builder = builder.http2_adaptive_window(true);
    }

    Ok(builder.default_headers(headers).build()?)
}

/// Sends once; non-2xx answers become a decoded [`ProviderError::Rest`].
pub(super) async fn send_rest(request: RequestBuilder) -> Result<Response, ProviderError> {
    let resp = request.send().await?;
    if resp.status().is_success() {
        return Ok(resp);
    }
    Err(rest_error(resp).await)
}

/// Idempotent reads only: retries transport failures and 5xx answers.
pub(super) async fn send_rest_with_retry<F>(
    policy: ExponentialBuilder,
    path: &str,
    build: F,
) -> Result<Response, ProviderError>
where
    F: Fn() -> RequestBuilder,
{
    (|| send_rest(build()))
        .retry(policy)
        .when(|err: &ProviderError| err.is_retryable())
        .notify(|err, dur: Duration| {
            tracing::warn!(path, "Backend read retrying after error {} in {:?}", err, dur);
        })
        .await
}

pub(super) async fn rest_error(resp: Response) -> ProviderError {
    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return ProviderError::Reqwest(e),
    };

    match serde_json::from_slice::<RestErrorBody>(&bytes) {
        Ok(body) if body.code.is_some() || !body.message.is_empty() => {
            tracing::debug!(
                %status,
                code = ?body.code,
                details = ?body.details,
                "Backend rejected query"
            );
            ProviderError::Rest { status, body }
        }
        _ => {
            let body = body_preview(&bytes);
            tracing::debug!(%status, body = %body, "Backend returned non-JSON error");
            ProviderError::UpstreamStatus { status, body }
        }
    }
}

pub(super) async fn auth_error(resp: Response) -> ProviderError {
    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return ProviderError::Reqwest(e),
    };

    match serde_json::from_slice::<AuthErrorBody>(&bytes)
        .ok()
        .and_then(AuthErrorBody::into_message)
    {
        Some(message) => ProviderError::Auth { status, message },
        None => ProviderError::UpstreamStatus {
            status,
            body: body_preview(&bytes),
        },
    }
}
