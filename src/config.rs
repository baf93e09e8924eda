//! Configuration management for zk-session.
//!
//! Handles loading the session configuration from a TOML file and
//! environment variables, and parsing the ensemble connection string.

use crate::error::{Result, ZkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Port used for ensemble members that do not specify one.
pub const DEFAULT_CLIENT_PORT: u16 = 2181;

/// Environment variable overriding [`SessionConfig::connection_string`].
pub const ENV_CONNECTION_STRING: &str = "ZOOKEEPER_CONNECTION_STRING";
/// Environment variable overriding [`SessionConfig::timeout_ms`].
pub const ENV_SESSION_TIMEOUT: &str = "ZOOKEEPER_SESSION_TIMEOUT";
/// Environment variable overriding [`SessionConfig::can_be_read_only`].
pub const ENV_CAN_BE_READ_ONLY: &str = "ZOOKEEPER_CAN_BE_READ_ONLY";

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Session settings for the shared coordination client.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Settings used to construct the coordination client.
///
/// Immutable once handed to a [`crate::connection::ConnectionManager`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Ensemble member list with optional chroot, e.g. `zk1:2181,zk2:2181/app`.
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Session timeout in milliseconds.
    #[serde(rename = "timeout", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the session may fall back to a read-only server.
    #[serde(default)]
    pub can_be_read_only: bool,
}

fn default_connection_string() -> String {
    "localhost:2181".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            timeout_ms: default_timeout_ms(),
            can_be_read_only: false,
        }
    }
}

impl SessionConfig {
    /// Creates a session config with the given connection string and defaults otherwise.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Default::default()
        }
    }

    /// Sets the session timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the read-only flag.
    pub fn with_read_only(mut self, can_be_read_only: bool) -> Self {
        self.can_be_read_only = can_be_read_only;
        self
    }

    /// Returns the session timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parses the connection string.
    pub fn connect_string(&self) -> Result<ConnectString> {
        ConnectString::parse(&self.connection_string)
    }

    /// Checks that the config can be used to construct a client.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(ZkError::config("Session timeout must be greater than zero"));
        }
        self.connect_string().map(|_| ())
    }

    /// Applies `ZOOKEEPER_*` environment variables on top of this config.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(conn) = lookup(ENV_CONNECTION_STRING) {
            self.connection_string = conn;
        }
        if let Some(timeout) = lookup(ENV_SESSION_TIMEOUT) {
            match timeout.trim().parse() {
                Ok(ms) => self.timeout_ms = ms,
                Err(e) => warn!(value = %timeout, "Ignoring {ENV_SESSION_TIMEOUT}: {e}"),
            }
        }
        if let Some(flag) = lookup(ENV_CAN_BE_READ_ONLY) {
            match flag.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => self.can_be_read_only = true,
                "false" | "0" | "no" => self.can_be_read_only = false,
                _ => warn!(value = %flag, "Ignoring {ENV_CAN_BE_READ_ONLY}: expected a boolean"),
            }
        }
    }

    /// Returns a short description for log output.
    pub fn display_string(&self) -> String {
        let mode = if self.can_be_read_only {
            ", read-only allowed"
        } else {
            ""
        };
        format!(
            "{} (timeout {}ms{mode})",
            self.connection_string, self.timeout_ms
        )
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zk-session")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ZkError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ZkError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}

/// A single ensemble member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parsed connection string: ensemble members plus an optional chroot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectString {
    pub hosts: Vec<HostAddress>,
    pub chroot: Option<String>,
}

impl ConnectString {
    /// Parses `host[:port][,host[:port]...][/chroot]`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (host_part, chroot) = match input.find('/') {
            Some(idx) => (&input[..idx], Some(&input[idx..])),
            None => (input, None),
        };

        let chroot = match chroot {
            None | Some("/") => None,
            Some(path) => {
                validate_chroot(path)?;
                Some(path.to_string())
            }
        };

        let mut hosts = Vec::new();
        for entry in host_part.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            hosts.push(parse_host(entry)?);
        }

        if hosts.is_empty() {
            return Err(ZkError::config("Connection string contains no hosts"));
        }

        Ok(Self { hosts, chroot })
    }
}

impl fmt::Display for ConnectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts: Vec<String> = self.hosts.iter().map(ToString::to_string).collect();
        write!(f, "{}", hosts.join(","))?;
        if let Some(chroot) = &self.chroot {
            write!(f, "{chroot}")?;
        }
        Ok(())
    }
}

fn parse_host(entry: &str) -> Result<HostAddress> {
    let (host, port) = if let Some(rest) = entry.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| ZkError::config(format!("Unterminated IPv6 address: {entry}")))?;
        let port = match &rest[end + 1..] {
            "" => None,
            tail => Some(tail.strip_prefix(':').ok_or_else(|| {
                ZkError::config(format!("Unexpected characters after address: {entry}"))
            })?),
        };
        (&rest[..end], port)
    } else {
        match entry.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (entry, None),
        }
    };

    if host.is_empty() {
        return Err(ZkError::config(format!("Missing host in '{entry}'")));
    }

    let port = match port {
        None => DEFAULT_CLIENT_PORT,
        Some(p) => match p.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(ZkError::config(format!("Invalid port in '{entry}'"))),
        },
    };

    Ok(HostAddress {
        host: host.to_string(),
        port,
    })
}

fn validate_chroot(path: &str) -> Result<()> {
    if path.ends_with('/') {
        return Err(ZkError::config(format!(
            "Invalid chroot '{path}': must not end with '/'"
        )));
    }
    for segment in path.split('/').skip(1) {
        match segment {
            "" => {
                return Err(ZkError::config(format!(
                    "Invalid chroot '{path}': empty path segment"
                )))
            }
            "." | ".." => {
                return Err(ZkError::config(format!(
                    "Invalid chroot '{path}': relative segment '{segment}'"
                )))
            }
            _ => {}
        }
    }
    Ok(())
}
