//! Client for the hosted backend: PostgREST tables, GoTrue auth and Realtime
//! change feeds. The service owns no rows; everything goes through here.

mod auth;
mod http;
mod query;
pub mod realtime;

pub use auth::{AuthApi, AuthUser, Session, SignUpOutcome};
pub use query::{Query, parse_content_range};
pub use realtime::{ChangeEvent, ChangeFilter, ChangeRecord, RealtimeClient, Subscription};

use crate::config::SupabaseConfig;
use crate::error::ProviderError;
use backon::ExponentialBuilder;
use moka::sync::Cache;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

const AUTH_CACHE_CAPACITY: u64 = 10_000;

/// Cheap-to-clone handle shared by every request handler.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    rest_url: Url,
    auth_url: Url,
    anon_key: Arc<str>,
    read_retry: ExponentialBuilder,
    auth_cache: Option<Cache<String, AuthUser, ahash::RandomState>>,
    heartbeat: Duration,
}

impl SupabaseClient {
    pub fn from_config(cfg: &SupabaseConfig) -> Result<Self, ProviderError> {
        let base = cfg
            .url
            .clone()
            .ok_or(ProviderError::Config("supabase.url"))?;
        if cfg.anon_key.trim().is_empty() {
            return Err(ProviderError::Config("supabase.anon_key"));
        }

        let base = with_trailing_slash(base);
        let rest_url = base.join("rest/v1/")?;
        let auth_url = base.join("auth/v1/")?;

        let http = http::build_client(
            cfg.anon_key.as_str(),
            cfg.proxy.clone(),
            cfg.enable_multiplexing,
        )?;

        let read_retry = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        let auth_cache = cfg.auth_cache_ttl().map(|ttl| {
            Cache::builder()
                .max_capacity(AUTH_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build_with_hasher(ahash::RandomState::new())
        });

        info!(
            supabase_url = %base,
            proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
            enable_multiplexing = cfg.enable_multiplexing,
            retry_max_times = cfg.retry_max_times,
            auth_cache_ttl_secs = cfg.auth_cache_ttl_secs,
            "Backend client configured"
        );

        Ok(Self {
            http,
            base,
            rest_url,
            auth_url,
            anon_key: Arc::from(cfg.anon_key.as_str()),
            read_retry,
            auth_cache,
            heartbeat: cfg.heartbeat(),
        })
    }

    /// Starts a PostgREST query against `table`.
    pub fn from(&self, table: &str) -> Query<'_> {
        Query::new(self, table)
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// Realtime client bound to the same project and key.
    pub fn realtime(&self) -> Result<RealtimeClient, ProviderError> {
        RealtimeClient::new(&self.base, &self.anon_key, self.heartbeat)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
pub(crate) fn test_client(base: &str) -> SupabaseClient {
    let cfg = SupabaseConfig {
        url: Some(Url::parse(base).expect("valid test url")),
        anon_key: "anon-test-key".to_string(),
        ..Default::default()
    };
    SupabaseClient::from_config(&cfg).expect("test client")
}
