mod basic;
mod store;
mod supabase;

pub use basic::BasicConfig;
pub use store::StoreConfig;
pub use supabase::SupabaseConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Hosted backend settings (see `supabase` table in config.toml).
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// Storefront rules (see `store` table in config.toml).
    #[serde(default)]
    pub store: StoreConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "VECTORSHOP_";

/// Unprefixed variables understood for compatibility with existing `.env` files.
const LEGACY_ENV_KEYS: [&str; 3] = ["supabase_url", "supabase_anon_key", "port"];

impl Config {
    /// Builds a Figment that merges defaults, `config.toml` and the environment.
    ///
    /// Precedence (lowest first): defaults, `config.toml`, legacy variables
    /// (`SUPABASE_URL`, `SUPABASE_ANON_KEY`, `PORT`), `VECTORSHOP_*` variables.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment
            .merge(
                Env::raw()
                    .only(&LEGACY_ENV_KEYS)
                    .map(|key| legacy_key_path(key.as_str()).into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration from every source and validates required fields.
    pub fn from_sources() -> Self {
        let cfg: Self = Self::figment()
            .extract()
            .unwrap_or_else(|err| panic!("failed to extract configuration: {err}"));
        if let Err(problem) = cfg.validate() {
            panic!("{problem}");
        }
        cfg
    }

    /// Checks the fields that have no usable default.
    pub fn validate(&self) -> Result<(), String> {
        if self.supabase.url.is_none() {
            return Err("supabase.url (or SUPABASE_URL) must be set".to_string());
        }
        if self.supabase.anon_key.trim().is_empty() {
            return Err("supabase.anon_key (or SUPABASE_ANON_KEY) must be set and non-empty".to_string());
        }
        Ok(())
    }
}

fn legacy_key_path(key: &str) -> String {
    match key {
        "supabase_url" => "supabase.url".to_string(),
        "supabase_anon_key" => "supabase.anon_key".to_string(),
        "port" => "basic.listen_port".to_string(),
        other => other.to_string(),
    }
}
