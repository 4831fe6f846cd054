//! Configuration loading from `.env` files.

use std::{env, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};

use crate::community::{CommunityConfig, Timeouts};

pub const DEFAULT_RELAY: &str = "wss://relay.damus.io";
pub const DEFAULT_BIND_HTTP: &str = "127.0.0.1:4000";
pub const DEFAULT_SCOPE: &str = "blueorb";

/// Every variable read by [`Settings::from_env`].
pub const ENV_KEYS: [&str; 11] = [
    "NOSTR_RELAYS",
    "NOSTR_RELAY",
    "BIND_HTTP",
    "COMMUNITY_SCOPE",
    "PUBLISH_TIMEOUT_MS",
    "QUERY_TIMEOUT_MS",
    "FEED_TIMEOUT_MS",
    "TOMBSTONE_TIMEOUT_MS",
    "STATS_TIMEOUT_MS",
    "VERIFY_SIG",
    "TOR_SOCKS",
];

/// Runtime settings derived from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Relay endpoints, e.g. `wss://relay.damus.io`.
    pub relays: Vec<String>,
    /// HTTP bind address, e.g. `127.0.0.1:4000`.
    pub bind_http: SocketAddr,
    /// `t` tag value shared by every community event.
    pub scope: String,
    pub timeouts: Timeouts,
    /// Drop relay events whose id or signature does not verify.
    pub verify_sig: bool,
    /// Optional Tor SOCKS proxy (host:port).
    pub tor_socks: Option<String>,
}

impl Settings {
    /// Load settings from the specified `.env` file.
    ///
    /// Variables already present in the process environment take precedence.
    pub fn from_env(path: &str) -> Result<Self> {
        dotenvy::from_filename(path).with_context(|| format!("reading env file {path}"))?;
        let mut relays = csv_strings(env::var("NOSTR_RELAYS").unwrap_or_default());
        if relays.is_empty() {
            relays = csv_strings(env::var("NOSTR_RELAY").unwrap_or_default());
        }
        if relays.is_empty() {
            relays.push(DEFAULT_RELAY.to_string());
        }
        let bind_http = non_empty_var("BIND_HTTP")
            .unwrap_or_else(|| DEFAULT_BIND_HTTP.into())
            .parse()
            .context("parsing BIND_HTTP")?;
        let scope = non_empty_var("COMMUNITY_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.into());
        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            publish: millis("PUBLISH_TIMEOUT_MS", defaults.publish)?,
            query: millis("QUERY_TIMEOUT_MS", defaults.query)?,
            feed: millis("FEED_TIMEOUT_MS", defaults.feed)?,
            tombstone: millis("TOMBSTONE_TIMEOUT_MS", defaults.tombstone)?,
            stats: millis("STATS_TIMEOUT_MS", defaults.stats)?,
        };
        let verify_sig = non_empty_var("VERIFY_SIG").map_or(true, |v| v != "0");
        let tor_socks = non_empty_var("TOR_SOCKS");
        Ok(Self {
            relays,
            bind_http,
            scope,
            timeouts,
            verify_sig,
            tor_socks,
        })
    }

    pub fn community_config(&self) -> CommunityConfig {
        CommunityConfig {
            scope: self.scope.clone(),
            relays: self.relays.clone(),
            tor_socks: self.tor_socks.clone(),
            verify_sig: self.verify_sig,
            timeouts: self.timeouts,
        }
    }
}

/// Contents written by `stoa init`.
pub fn default_env_file() -> String {
    let mut content = String::new();
    content.push_str(&format!("NOSTR_RELAYS={DEFAULT_RELAY}\n"));
    content.push_str(&format!("BIND_HTTP={DEFAULT_BIND_HTTP}\n"));
    content.push_str(&format!("COMMUNITY_SCOPE={DEFAULT_SCOPE}\n"));
    content.push_str("PUBLISH_TIMEOUT_MS=3000\n");
    content.push_str("QUERY_TIMEOUT_MS=3000\n");
    content.push_str("FEED_TIMEOUT_MS=10000\n");
    content.push_str("TOMBSTONE_TIMEOUT_MS=2000\n");
    content.push_str("STATS_TIMEOUT_MS=5000\n");
    content.push_str("VERIFY_SIG=1\n");
    content.push_str("TOR_SOCKS=\n");
    content
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn millis(key: &str, default: Duration) -> Result<Duration> {
    match non_empty_var(key) {
        Some(v) => {
            let ms: u64 = v.parse().with_context(|| format!("parsing {key}"))?;
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}

/// Split a comma-separated string into trimmed string values.
pub fn csv_strings(input: impl AsRef<str>) -> Vec<String> {
    input
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs, sync::Mutex};
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for v in ENV_KEYS {
            env::remove_var(v);
        }
    }

    fn load(content: &str) -> Result<Settings> {
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(&env_path, content).unwrap();
        Settings::from_env(env_path.to_str().unwrap())
    }

    #[test]
    fn loads_env() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load(concat!(
            "NOSTR_RELAYS=wss://r1.example, wss://r2.example\n",
            "BIND_HTTP=127.0.0.1:8080\n",
            "COMMUNITY_SCOPE=physics\n",
            "PUBLISH_TIMEOUT_MS=1500\n",
            "FEED_TIMEOUT_MS=4000\n",
            "VERIFY_SIG=0\n",
            "TOR_SOCKS=127.0.0.1:9050\n",
        ))
        .unwrap();
        assert_eq!(cfg.relays, vec!["wss://r1.example", "wss://r2.example"]);
        assert_eq!(cfg.bind_http, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.scope, "physics");
        assert_eq!(cfg.timeouts.publish, Duration::from_millis(1500));
        assert_eq!(cfg.timeouts.feed, Duration::from_millis(4000));
        assert_eq!(cfg.timeouts.query, Duration::from_millis(3000));
        assert!(!cfg.verify_sig);
        assert_eq!(cfg.tor_socks, Some("127.0.0.1:9050".into()));
    }

    #[test]
    fn defaults_when_optional_absent() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load("TOR_SOCKS=\n").unwrap();
        assert_eq!(cfg.relays, vec![DEFAULT_RELAY]);
        assert_eq!(cfg.bind_http, DEFAULT_BIND_HTTP.parse().unwrap());
        assert_eq!(cfg.scope, DEFAULT_SCOPE);
        assert_eq!(cfg.timeouts, Timeouts::default());
        assert!(cfg.verify_sig);
        assert!(cfg.tor_socks.is_none());
    }

    #[test]
    fn single_relay_fallback() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load("NOSTR_RELAYS=\nNOSTR_RELAY=ws://localhost:7777\n").unwrap();
        assert_eq!(cfg.relays, vec!["ws://localhost:7777"]);
    }

    #[test]
    fn invalid_values_error() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(load("BIND_HTTP=not-an-addr\n").is_err());
        clear_env();
        assert!(load("QUERY_TIMEOUT_MS=soon\n").is_err());
    }

    #[test]
    fn missing_file_errors() {
        assert!(Settings::from_env("/nonexistent/stoa/.env").is_err());
    }

    #[test]
    fn default_file_round_trips() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load(&default_env_file()).unwrap();
        assert_eq!(cfg.relays, vec![DEFAULT_RELAY]);
        assert_eq!(cfg.timeouts, Timeouts::default());
        assert!(cfg.verify_sig);
        let community = cfg.community_config();
        assert_eq!(community.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn csv_helper() {
        assert_eq!(csv_strings("a, b , ,c"), vec!["a", "b", "c"]);
        assert!(csv_strings("").is_empty());
    }
}
