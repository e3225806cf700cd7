//! Server configuration loaded from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// How long an ended room stays readable (results export) before removal
    pub room_grace: Duration,
    /// Per-room broadcast buffer; slower receivers get resynced with a snapshot
    pub broadcast_capacity: usize,
    /// When set, `save_resultats` also writes the document here
    pub results_dir: Option<PathBuf>,
    pub static_dir: PathBuf,
    /// Player cap applied to rooms created without one
    pub default_max_players: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6573)),
            room_grace: Duration::from_secs(300),
            broadcast_capacity: 100,
            results_dir: None,
            static_dir: PathBuf::from("static"),
            default_max_players: None,
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env_or("POKER_BIND_ADDR", defaults.bind_addr);
        let room_grace = Duration::from_secs(env_or(
            "POKER_ROOM_GRACE_SECS",
            defaults.room_grace.as_secs(),
        ));
        let broadcast_capacity = env_or("POKER_BROADCAST_CAPACITY", defaults.broadcast_capacity);
        let broadcast_capacity = if broadcast_capacity == 0 {
            tracing::warn!("POKER_BROADCAST_CAPACITY must be positive, using default");
            defaults.broadcast_capacity
        } else {
            broadcast_capacity
        };
        let results_dir = env_non_empty("POKER_RESULTS_DIR").map(PathBuf::from);
        let static_dir = env_non_empty("POKER_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        let default_max_players = env_non_empty("POKER_DEFAULT_MAX_PLAYERS").and_then(|v| {
            match v.parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    tracing::warn!("Ignoring invalid POKER_DEFAULT_MAX_PLAYERS: {:?}", v);
                    None
                }
            }
        });

        tracing::info!(
            %bind_addr,
            room_grace_secs = room_grace.as_secs(),
            broadcast_capacity,
            results_export = results_dir.is_some(),
            "Server config loaded"
        );

        Self {
            bind_addr,
            room_grace,
            broadcast_capacity,
            results_dir,
            static_dir,
            default_max_players,
        }
    }
}
