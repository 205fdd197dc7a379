// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Configuration loading and first-run generation.
//!
//! The on-disk file only covers the user-editable knobs; everything
//! derived from the config directory (cache/log/lock paths) is computed
//! here rather than stored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PORT: u16 = 7860;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TMUX_COLS: u16 = 120;
const DEFAULT_TMUX_ROWS: u16 = 40;
const DEFAULT_SCROLLBACK_LINES: u32 = 10_000;
const DEFAULT_CLAUDE_BINARY: &str = "claude";
const DEFAULT_MAX_SESSIONS: usize = 5;
const DEFAULT_WS_HEARTBEAT_SECS: u64 = 30;
const DEFAULT_WS_MAX_MISSED_PONGS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a home directory")]
    NoHomeDir,
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Yaml { path: PathBuf, source: serde_yaml::Error },
    #[error("auth.psk is empty in {path}")]
    EmptyPsk { path: PathBuf },
}

/// The subset of configuration persisted in `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    host: String,
    port: u16,
    auth: AuthSection,
    tmux: TmuxSection,
    claude: ClaudeSection,
    rate_limit: RateLimitSection,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            auth: AuthSection::default(),
            tmux: TmuxSection::default(),
            claude: ClaudeSection::default(),
            rate_limit: RateLimitSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AuthSection {
    psk: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self { psk: generate_psk() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct TmuxSection {
    default_cols: u16,
    default_rows: u16,
    scrollback_lines: u32,
}

impl Default for TmuxSection {
    fn default() -> Self {
        Self {
            default_cols: DEFAULT_TMUX_COLS,
            default_rows: DEFAULT_TMUX_ROWS,
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ClaudeSection {
    binary: String,
    session_dir: String,
    max_sessions: usize,
}

impl Default for ClaudeSection {
    fn default() -> Self {
        Self {
            binary: DEFAULT_CLAUDE_BINARY.to_string(),
            session_dir: "~/.claude/projects".to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RateLimitSection {
    ws_heartbeat: u64,
    ws_max_missed_pongs: u32,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            ws_heartbeat: DEFAULT_WS_HEARTBEAT_SECS,
            ws_max_missed_pongs: DEFAULT_WS_MAX_MISSED_PONGS,
        }
    }
}

fn generate_psk() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Fully resolved daemon configuration: user-editable knobs plus the
/// paths derived from the config directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub auth_psk: String,
    pub tmux_default_cols: u16,
    pub tmux_default_rows: u16,
    pub tmux_scrollback_lines: u32,
    pub claude_binary: String,
    pub claude_session_dir: PathBuf,
    pub claude_max_sessions: usize,
    pub ws_heartbeat_secs: u64,
    pub ws_max_missed_pongs: u32,

    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub cache_path: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
}

/// Resolve the config directory: `CLAUDE_RELAY_CONFIG_DIR` overrides
/// `XDG_CONFIG_HOME`, which overrides `~/.config/claude-relay`.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("CLAUDE_RELAY_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("claude-relay"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".config/claude-relay"))
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(unix)]
fn set_private_dir_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_private_dir_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_private_file_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_private_file_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl Config {
    /// Load configuration from the resolved config directory, generating
    /// `config.yaml` with a fresh random PSK on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = config_dir()?;
        Self::load_from_dir(dir)
    }

    pub fn load_from_dir(dir: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir.clone(), source })?;
        set_private_dir_mode(&dir).map_err(|source| ConfigError::Io { path: dir.clone(), source })?;

        let config_path = dir.join("config.yaml");
        let raw = if config_path.exists() {
            let text = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::Io { path: config_path.clone(), source })?;
            serde_yaml::from_str(&text)
                .map_err(|source| ConfigError::Yaml { path: config_path.clone(), source })?
        } else {
            let raw = RawConfig::default();
            let text = serde_yaml::to_string(&raw)
                .map_err(|source| ConfigError::Yaml { path: config_path.clone(), source })?;
            fs::write(&config_path, text).map_err(|source| ConfigError::Io { path: config_path.clone(), source })?;
            set_private_file_mode(&config_path)
                .map_err(|source| ConfigError::Io { path: config_path.clone(), source })?;
            raw
        };

        if raw.auth.psk.is_empty() {
            return Err(ConfigError::EmptyPsk { path: config_path });
        }

        Ok(Config {
            host: raw.host,
            port: raw.port,
            auth_psk: raw.auth.psk,
            tmux_default_cols: raw.tmux.default_cols,
            tmux_default_rows: raw.tmux.default_rows,
            tmux_scrollback_lines: raw.tmux.scrollback_lines,
            claude_binary: raw.claude.binary,
            claude_session_dir: expand_tilde(&raw.claude.session_dir),
            claude_max_sessions: raw.claude.max_sessions,
            ws_heartbeat_secs: raw.rate_limit.ws_heartbeat,
            ws_max_missed_pongs: raw.rate_limit.ws_max_missed_pongs,
            cache_path: dir.join("session-cache.json"),
            log_path: dir.join("claude-relay.log"),
            lock_path: dir.join("claude-relay.lock"),
            config_dir: dir,
            config_path,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
