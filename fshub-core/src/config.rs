//! Configuration file management for fshub-relay.
//!
//! Reads/writes `~/.fshub-relay/config.yaml` with server bind settings,
//! the audit database path, the Discord webhook URL and the admin token.

use std::path::{Path, PathBuf};

use crate::types::RelayError;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discord_webhook: Option<String>,
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, shown as the address to give FSHub.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
                public_url: None,
            },
            database: DatabaseConfig {
                path: "data/fshub.db".into(),
            },
            discord_webhook: None,
            admin_token: None,
        }
    }
}

impl ServerConfig {
    /// Base URL FSHub should post to (public URL if set, else the bind address).
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Get the config directory path (`~/.fshub-relay/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".fshub-relay")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `path` (normally [`config_file`]).
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text).unwrap_or_default()
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), RelayError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Parse simple YAML-like config text.
pub fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        // Split on the first ": " so URLs keep their scheme colon.
        let Some((key, val)) = split_key_value(stripped) else {
            continue;
        };

        if !is_indented {
            if val.is_empty() {
                current_section = Some(key.to_string());
            } else {
                current_section = None;
                match key {
                    "discord_webhook" => config.discord_webhook = parse_string_value(val),
                    "admin_token" => config.admin_token = parse_string_value(val),
                    _ => {}
                }
            }
        } else if let Some(ref section) = current_section {
            match section.as_str() {
                "server" => match key {
                    "host" => {
                        if let Some(v) = parse_string_value(val) {
                            config.server.host = v;
                        }
                    }
                    "port" => {
                        if let Ok(v) = val.parse::<u16>() {
                            config.server.port = v;
                        }
                    }
                    "public_url" => config.server.public_url = parse_string_value(val),
                    _ => {}
                },
                "database" => {
                    if key == "path" {
                        if let Some(v) = parse_string_value(val) {
                            config.database.path = v;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Some(config)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    if let Some(key) = line.strip_suffix(':') {
        return Some((key.trim(), ""));
    }
    line.split_once(": ")
        .map(|(k, v)| (k.trim(), v.trim()))
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        let inner = &val[1..val.len() - 1];
        return if inner.is_empty() {
            None
        } else {
            Some(inner.to_string())
        };
    }
    Some(val.to_string())
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# fshub-relay configuration".to_string(), String::new()];

    lines.push("server:".into());
    lines.push(format!("  host: \"{}\"", config.server.host));
    lines.push(format!("  port: {}", config.server.port));
    match &config.server.public_url {
        Some(url) => lines.push(format!("  public_url: \"{url}\"")),
        None => lines.push("  public_url: null".into()),
    }
    lines.push(String::new());

    lines.push("database:".into());
    lines.push(format!("  path: \"{}\"", config.database.path));
    lines.push(String::new());

    match &config.discord_webhook {
        Some(url) => lines.push(format!("discord_webhook: \"{url}\"")),
        None => lines.push("discord_webhook: null".into()),
    }
    match &config.admin_token {
        Some(token) => lines.push(format!("admin_token: \"{token}\"")),
        None => lines.push("admin_token: null".into()),
    }

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
