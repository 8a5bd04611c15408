use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Hosted backend (database, auth, realtime) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abcd.supabase.co`.
    /// TOML: `supabase.url`. Env: `SUPABASE_URL`. Required.
    #[serde(default)]
    pub url: Option<Url>,

    /// Public anon key sent as `apikey` on every request.
    /// TOML: `supabase.anon_key`. Env: `SUPABASE_ANON_KEY`. Required.
    #[serde(default)]
    pub anon_key: String,

    /// Optional outbound HTTP proxy for REST/auth calls.
    /// TOML: `supabase.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for the reqwest client; disabled forces HTTP/1.
    /// TOML: `supabase.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,

    /// Max retry attempts for idempotent reads. Writes are never retried.
    /// TOML: `supabase.retry_max_times`. Default: `2`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Realtime channel heartbeat interval in seconds.
    /// TOML: `supabase.heartbeat_secs`. Default: `25`.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// How long a validated access token is trusted without asking the auth server again.
    /// TOML: `supabase.auth_cache_ttl_secs`. Default: `30`. `0` disables the cache.
    #[serde(default = "default_auth_cache_ttl_secs")]
    pub auth_cache_ttl_secs: u64,
}

impl SupabaseConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn auth_cache_ttl(&self) -> Option<Duration> {
        (self.auth_cache_ttl_secs > 0).then(|| Duration::from_secs(self.auth_cache_ttl_secs))
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: String::new(),
            proxy: None,
            enable_multiplexing: false,
            retry_max_times: default_retry_max_times(),
            heartbeat_secs: default_heartbeat_secs(),
            auth_cache_ttl_secs: default_auth_cache_ttl_secs(),
        }
    }
}

fn default_retry_max_times() -> usize {
    2
}

fn default_heartbeat_secs() -> u64 {
    25
}

fn default_auth_cache_ttl_secs() -> u64 {
    30
}
