//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use celeste_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_UPSTREAM_URL};

/// Which API key the completion relay sends upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Use the caller's `apiKey` when present, otherwise the server key.
    /// Neither present is a client error (400).
    #[default]
    ClientFirst,
    /// Always use the server key and ignore the caller's. A missing server
    /// key is a deployment error (500).
    ServerOnly,
}

impl FromStr for KeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client-first" | "client_first" => Ok(Self::ClientFirst),
            "server-only" | "server_only" => Ok(Self::ServerOnly),
            other => Err(format!(
                "unknown key policy '{other}' (expected client-first or server-only)"
            )),
        }
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `127.0.0.1:8080`
    pub http_addr: SocketAddr,

    /// Server-side key for the completion API.
    /// Env: `API_KEY`
    /// Default: none. An empty value counts as none.
    pub api_key: Option<String>,

    /// Chat-completion endpoint requests are relayed to.
    /// Env: `UPSTREAM_URL`
    /// Default: OpenRouter's `/api/v1/chat/completions`.
    pub upstream_url: String,

    /// Env: `KEY_POLICY` (`client-first` / `server-only`)
    /// Default: `client-first`
    pub key_policy: KeyPolicy,

    /// SQLite file holding chat transcripts.
    /// Env: `DATABASE_PATH`
    /// Default: none, meaning the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([127, 0, 0, 1], DEFAULT_HTTP_PORT).into(),
            api_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            key_policy: KeyPolicy::default(),
            database_path: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(key) = lookup("API_KEY") {
            let key = key.trim();
            if !key.is_empty() {
                config.api_key = Some(key.to_string());
            }
        }

        if let Some(url) = lookup("UPSTREAM_URL") {
            if !url.trim().is_empty() {
                config.upstream_url = url.trim().to_string();
            }
        }

        if let Some(policy) = lookup("KEY_POLICY") {
            match policy.parse() {
                Ok(parsed) => config.key_policy = parsed,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid KEY_POLICY, using default");
                }
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_url", &self.upstream_url)
            .field("key_policy", &self.key_policy)
            .field("database_path", &self.database_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 8080).into());
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.key_policy, KeyPolicy::ClientFirst);
        assert!(config.api_key.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("HTTP_ADDR", "0.0.0.0:9000"),
            ("API_KEY", "sk-server"),
            ("UPSTREAM_URL", "http://localhost:1234/v1/chat/completions"),
            ("KEY_POLICY", "server-only"),
            ("DATABASE_PATH", "/tmp/celeste.db"),
        ]);

        assert_eq!(config.http_addr, ([0, 0, 0, 0], 9000).into());
        assert_eq!(config.api_key.as_deref(), Some("sk-server"));
        assert_eq!(
            config.upstream_url,
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(config.key_policy, KeyPolicy::ServerOnly);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/celeste.db")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("API_KEY", "   "),
            ("KEY_POLICY", "whatever"),
        ]);

        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert!(config.api_key.is_none());
        assert_eq!(config.key_policy, KeyPolicy::ClientFirst);
    }

    #[test]
    fn test_key_policy_parse() {
        assert_eq!("Server_Only".parse::<KeyPolicy>(), Ok(KeyPolicy::ServerOnly));
        assert_eq!("client-first".parse::<KeyPolicy>(), Ok(KeyPolicy::ClientFirst));
        assert!("open".parse::<KeyPolicy>().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("API_KEY", "sk-very-secret")]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
