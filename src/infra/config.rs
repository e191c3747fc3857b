//! Centralized configuration (environment variables + defaults).

use anyhow::{anyhow, Context};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAYER_KEYPAIR: &str = "~/.config/solana/id.json";
pub const DEFAULT_RATE_LIMIT_PER_IP: u32 = 100;
pub const DEFAULT_RATE_LIMIT_GLOBAL: u32 = 10_000;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    Solana,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    /// Set this to the Program ID you deployed (e.g. output of `anchor deploy`).
    pub program_id: String,
    /// Already tilde-expanded.
    pub payer_keypair_path: String,
    pub asset_mint: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub per_ip: u32,
    pub global: u32,
    pub window: Duration,
    pub max_entries: usize,
    /// Use the first `X-Forwarded-For` hop as client address.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_ip: DEFAULT_RATE_LIMIT_PER_IP,
            global: DEFAULT_RATE_LIMIT_GLOBAL,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            max_entries: DEFAULT_RATE_LIMIT_MAX_ENTRIES,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub ledger_mode: LedgerMode,
    pub solana: Option<SolanaConfig>,
    /// Raw `token:role:subject` list, parsed by the auth layer.
    pub api_keys: String,
    pub rate_limit: RateLimitConfig,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub hsts_enabled: bool,
    pub metrics_enabled: bool,
    pub log_json: bool,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:3000")?;

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(anyhow!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other)),
        };

        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORE_BACKEND=postgres"));
        }

        let ledger_mode = match var("LEDGER_MODE").as_deref() {
            None | Some("solana") => LedgerMode::Solana,
            Some("memory") => LedgerMode::Memory,
            Some(other) => return Err(anyhow!("LEDGER_MODE must be 'solana' or 'memory', got '{}'", other)),
        };

        let solana = match ledger_mode {
            LedgerMode::Memory => None,
            LedgerMode::Solana => {
                let keypair = var("SOLANA_PAYER_KEYPAIR")
                    .unwrap_or_else(|| DEFAULT_PAYER_KEYPAIR.to_string());
                Some(SolanaConfig {
                    rpc_url: var("SOLANA_RPC_URL").context("SOLANA_RPC_URL must be set")?,
                    program_id: var("SOLANA_PROGRAM_ID").context("SOLANA_PROGRAM_ID must be set")?,
                    payer_keypair_path: shellexpand::tilde(&keypair).into_owned(),
                    asset_mint: var("SOLANA_ASSET_MINT").context("SOLANA_ASSET_MINT must be set")?,
                })
            }
        };

        let rate_limit = RateLimitConfig {
            per_ip: parse_or(&var, "RATE_LIMIT_PER_IP", DEFAULT_RATE_LIMIT_PER_IP)?,
            global: parse_or(&var, "RATE_LIMIT_GLOBAL", DEFAULT_RATE_LIMIT_GLOBAL)?,
            window: Duration::from_secs(parse_or(
                &var,
                "RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )?),
            max_entries: parse_or(&var, "RATE_LIMIT_MAX_ENTRIES", DEFAULT_RATE_LIMIT_MAX_ENTRIES)?,
            trust_proxy_headers: parse_bool(&var, "TRUST_PROXY_HEADERS", false)?,
        };
        if rate_limit.per_ip == 0 || rate_limit.global == 0 || rate_limit.max_entries == 0 {
            return Err(anyhow!("rate limit values must be greater than zero"));
        }
        if rate_limit.window.is_zero() {
            return Err(anyhow!("RATE_LIMIT_WINDOW_SECS must be greater than zero"));
        }

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            store_backend,
            database_url,
            database_max_connections: parse_or(
                &var,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
            ledger_mode,
            solana,
            api_keys: var("REALSTACK_API_KEYS").unwrap_or_default(),
            rate_limit,
            cors_allowed_origins,
            hsts_enabled: parse_bool(&var, "HSTS_ENABLED", false)?,
            metrics_enabled: parse_bool(&var, "METRICS_ENABLED", true)?,
            log_json: var("LOG_FORMAT").as_deref() == Some("json"),
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, raw)),
    }
}

fn parse_bool<F>(var: &F, key: &str, default: bool) -> anyhow::Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.to_lowercase()).as_deref() {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(anyhow!("{} must be a boolean, got '{}'", key, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn memory_backends_need_no_external_settings() {
        let cfg = load(&[("STORE_BACKEND", "memory"), ("LEDGER_MODE", "memory")]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
        assert!(cfg.solana.is_none());
        assert_eq!(cfg.rate_limit.per_ip, DEFAULT_RATE_LIMIT_PER_IP);
        assert!(cfg.metrics_enabled);
        assert!(!cfg.hsts_enabled);
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = load(&[("LEDGER_MODE", "memory")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn solana_mode_requires_rpc_settings() {
        let err = load(&[("STORE_BACKEND", "memory")]).unwrap_err();
        assert!(err.to_string().contains("SOLANA_RPC_URL"));

        let cfg = load(&[
            ("STORE_BACKEND", "memory"),
            ("SOLANA_RPC_URL", "http://127.0.0.1:8899"),
            ("SOLANA_PROGRAM_ID", "REALstaXZRGVWvZ8xpHCxJVBGMtp7RKWMeJhmvXwXcL"),
            ("SOLANA_ASSET_MINT", "So11111111111111111111111111111111111111112"),
            ("SOLANA_PAYER_KEYPAIR", "/tmp/payer.json"),
        ])
        .unwrap();
        let solana = cfg.solana.unwrap();
        assert_eq!(solana.payer_keypair_path, "/tmp/payer.json");
    }

    #[test]
    fn parses_lists_and_flags() {
        let cfg = load(&[
            ("STORE_BACKEND", "memory"),
            ("LEDGER_MODE", "memory"),
            ("CORS_ALLOWED_ORIGINS", "https://app.realstack.io, http://localhost:5173"),
            ("HSTS_ENABLED", "true"),
            ("TRUST_PROXY_HEADERS", "1"),
            ("RATE_LIMIT_PER_IP", "7"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.cors_allowed_origins.len(), 2);
        assert!(cfg.hsts_enabled);
        assert!(cfg.rate_limit.trust_proxy_headers);
        assert_eq!(cfg.rate_limit.per_ip, 7);
        assert!(cfg.log_json);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("STORE_BACKEND", "sqlite")]).is_err());
        assert!(load(&[
            ("STORE_BACKEND", "memory"),
            ("LEDGER_MODE", "memory"),
            ("RATE_LIMIT_PER_IP", "0"),
        ])
        .is_err());
        assert!(load(&[
            ("STORE_BACKEND", "memory"),
            ("LEDGER_MODE", "memory"),
            ("HSTS_ENABLED", "maybe"),
        ])
        .is_err());
    }
}
