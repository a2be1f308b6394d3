use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Connection settings for the remote record-keeping service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL without a trailing slash, e.g. `https://example.cybozu.com`.
    pub base_url: String,
    /// Collection (app) id of the production log.
    pub log_app: String,
    /// API token with create permission on the log app.
    pub token: String,
    /// Optional token with update permission; completions need it.
    pub update_token: Option<String>,
    /// Optional read token for the lookup source apps.
    pub lookup_token: Option<String>,
    /// Static form schema JSON used when the live schema endpoint fails.
    pub static_schema: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// TTL of the cached form schema.
    pub schema_ttl_secs: u64,
    /// Page size for the server-side open work listing.
    pub open_work_page_size: u32,
}

/// How an unresolvable lookup value is treated at submission time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Submit the raw value as-is; the remote side enforces integrity.
    #[default]
    Passthrough,
    /// Reject the submission locally with a validation error.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Entries kept per lookup field before oldest-inserted eviction.
    pub cache_limit: usize,
    /// Page size for candidate searches.
    pub suggest_page_size: u32,
    /// Window within which repeated suggestion requests collapse to the last.
    pub debounce_ms: u64,
    #[serde(default)]
    pub policy: LookupPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/floorlog.db".to_string(),
                max_connections: 5,
            },
            remote: RemoteConfig {
                base_url: String::new(),
                log_app: String::new(),
                token: String::new(),
                update_token: None,
                lookup_token: None,
                static_schema: None,
                request_timeout_secs: 30,
            },
            sync: SyncConfig {
                schema_ttl_secs: 300, // 5 minutes
                open_work_page_size: 500,
            },
            lookup: LookupConfig {
                cache_limit: 200,
                suggest_page_size: 30,
                debounce_ms: 250,
                policy: LookupPolicy::Passthrough,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(url) = std::env::var("FLOORLOG_DATABASE_URL") {
            cfg.database.url = url;
        } else if let Some(dir) = dirs::data_dir() {
            let path = dir.join("floorlog").join("floorlog.db");
            cfg.database.url = format!("sqlite:{}", path.display());
        }
        if let Ok(base) = std::env::var("FLOORLOG_REMOTE_BASE") {
            cfg.remote.base_url = base.trim_end_matches('/').to_string();
        }
        if let Ok(app) = std::env::var("FLOORLOG_LOG_APP") {
            cfg.remote.log_app = app;
        }
        if let Ok(token) = std::env::var("FLOORLOG_TOKEN_LOG") {
            cfg.remote.token = token;
        }
        if let Ok(token) = std::env::var("FLOORLOG_TOKEN_LOG_UPDATE") {
            cfg.remote.update_token = Some(token);
        }
        if let Ok(token) = std::env::var("FLOORLOG_TOKEN_LOOKUP") {
            cfg.remote.lookup_token = Some(token);
        }
        if let Ok(schema) = std::env::var("FLOORLOG_FORM_SCHEMA") {
            cfg.remote.static_schema = Some(schema);
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.lookup.cache_limit, 200);
        assert_eq!(cfg.lookup.suggest_page_size, 30);
        assert_eq!(cfg.lookup.debounce_ms, 250);
        assert_eq!(cfg.sync.schema_ttl_secs, 300);
        assert_eq!(cfg.lookup.policy, LookupPolicy::Passthrough);
    }
}
