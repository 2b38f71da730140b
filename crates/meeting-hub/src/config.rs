//! Meeting Hub configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default listen port when neither `BIND_ADDRESS` nor `PORT` is set.
pub const DEFAULT_PORT: &str = "80";

/// Default capacity of each client's outbound queue.
pub const DEFAULT_CLIENT_SEND_BUFFER: usize = 256;

/// Default time allowed to read the next pong from a peer.
pub const DEFAULT_PONG_WAIT_SECONDS: u64 = 60;

/// Default time allowed to write a single frame to a peer.
pub const DEFAULT_WRITE_WAIT_SECONDS: u64 = 10;

/// Default maximum inbound message size in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512;

/// Default reclaimer sweep interval.
pub const DEFAULT_RECLAIM_INTERVAL_SECONDS: u64 = 60;

/// Default grace period before a never-joined meeting can be reclaimed.
pub const DEFAULT_IDLE_GRACE_SECONDS: u64 = 60;

/// Upper bound for every `*_SECONDS` setting (one day).
pub const MAX_DURATION_SECONDS: u64 = 86_400;

/// Meeting Hub configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP/WebSocket listen address.
    pub bind_address: String,

    /// SQLite connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Skip the same-origin check on WebSocket upgrades (local testing only).
    pub disable_origin_check: bool,

    /// Outbound queue capacity per client (default: 256).
    pub client_send_buffer: usize,

    /// Read deadline renewed on each pong (default: 60).
    pub pong_wait_seconds: u64,

    /// Deadline for each outbound write (default: 10).
    pub write_wait_seconds: u64,

    /// Maximum inbound message size in bytes (default: 512).
    pub max_message_size: usize,

    /// Reclaimer sweep interval (default: 60).
    pub reclaim_interval_seconds: u64,

    /// Age a never-joined meeting must reach before it is reclaimable (default: 60).
    pub idle_grace_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("disable_origin_check", &self.disable_origin_check)
            .field("client_send_buffer", &self.client_send_buffer)
            .field("pong_wait_seconds", &self.pong_wait_seconds)
            .field("write_wait_seconds", &self.write_wait_seconds)
            .field("max_message_size", &self.max_message_size)
            .field("reclaim_interval_seconds", &self.reclaim_interval_seconds)
            .field("idle_grace_seconds", &self.idle_grace_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match vars.get("BIND_ADDRESS") {
            Some(addr) => addr.clone(),
            None => {
                let port = vars.get("PORT").map_or(DEFAULT_PORT, String::as_str);
                format!("0.0.0.0:{port}")
            }
        };

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .cloned();

        // Presence alone disables the check, whatever the value.
        let disable_origin_check = vars.contains_key("DISABLEWEBSOCKETORIGINCHECK");

        let client_send_buffer =
            parse_positive(vars, "HUB_CLIENT_SEND_BUFFER", DEFAULT_CLIENT_SEND_BUFFER)?;
        let pong_wait_seconds = check_seconds(
            "HUB_PONG_WAIT_SECONDS",
            parse_positive(vars, "HUB_PONG_WAIT_SECONDS", DEFAULT_PONG_WAIT_SECONDS)?,
        )?;
        let write_wait_seconds = check_seconds(
            "HUB_WRITE_WAIT_SECONDS",
            parse_positive(vars, "HUB_WRITE_WAIT_SECONDS", DEFAULT_WRITE_WAIT_SECONDS)?,
        )?;
        let max_message_size =
            parse_positive(vars, "HUB_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE)?;
        let reclaim_interval_seconds = check_seconds(
            "HUB_RECLAIM_INTERVAL_SECONDS",
            parse_positive(
                vars,
                "HUB_RECLAIM_INTERVAL_SECONDS",
                DEFAULT_RECLAIM_INTERVAL_SECONDS,
            )?,
        )?;

        // Zero is allowed here: it makes fresh meetings reclaimable immediately.
        let idle_grace_seconds = match vars.get("HUB_IDLE_GRACE_SECONDS") {
            Some(raw) => check_seconds(
                "HUB_IDLE_GRACE_SECONDS",
                parse_value("HUB_IDLE_GRACE_SECONDS", raw)?,
            )?,
            None => DEFAULT_IDLE_GRACE_SECONDS,
        };

        Ok(Config {
            bind_address,
            database_url,
            disable_origin_check,
            client_send_buffer,
            pong_wait_seconds,
            write_wait_seconds,
            max_message_size,
            reclaim_interval_seconds,
            idle_grace_seconds,
        })
    }

    /// Read deadline for inbound frames.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_seconds)
    }

    /// Deadline for each outbound write.
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_seconds)
    }

    /// Keepalive ping period, nine tenths of the pong wait.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}")))
}

fn check_seconds(name: &str, value: u64) -> Result<u64, ConfigError> {
    if value > MAX_DURATION_SECONDS {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be at most {MAX_DURATION_SECONDS}"
        )));
    }
    Ok(value)
}

fn parse_positive<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };
    let value: T = parse_value(name, raw)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(value)
}
