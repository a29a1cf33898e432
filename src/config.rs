//! Server configuration
//!
//! Read once at startup from the command line and environment (a `.env`
//! file in the working directory is loaded first; real variables win):
//! - bind address: first argument, `CHAT_ADDR`, or `PORT` (binds `0.0.0.0`)
//! - `CHAT_HISTORY_CAP`: messages kept per room
//! - `CHAT_PAGE_SIZE`: messages per older-history page

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::AppError;
use crate::room::DEFAULT_HISTORY_CAP;
use crate::search::DEFAULT_PAGE_SIZE;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Channel buffer size for each client's outbound events
pub const CLIENT_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub history_cap: usize,
    pub page_size: usize,
    pub channel_buffer: usize,
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            page_size: DEFAULT_PAGE_SIZE,
            channel_buffer: CHANNEL_BUFFER_SIZE,
            client_buffer: CLIENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load from the process arguments and environment
    pub fn from_env() -> Result<Self, AppError> {
        load_env_file(Path::new(".env"));
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(std::env::args().nth(1), &env)
    }

    /// Load from an explicit address argument and variable map
    pub fn from_sources(arg: Option<String>, env: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(addr) = arg
            .or_else(|| env.get("CHAT_ADDR").cloned())
            .or_else(|| env.get("PORT").map(|port| format!("0.0.0.0:{}", port)))
        {
            config.addr = addr;
        }
        if let Some(cap) = parse_positive(env, "CHAT_HISTORY_CAP")? {
            config.history_cap = cap;
        }
        if let Some(size) = parse_positive(env, "CHAT_PAGE_SIZE")? {
            config.page_size = size;
        }

        Ok(config)
    }
}

/// Load variables from a `.env`-style file without overriding existing ones
///
/// Returns false if the file is missing or unreadable.
pub fn load_env_file(path: &Path) -> bool {
    match dotenv::from_path(path) {
        Ok(()) => true,
        Err(e) => {
            debug!("No env file loaded from {}: {}", path.display(), e);
            false
        }
    }
}

fn parse_positive(env: &HashMap<String, String>, key: &str) -> Result<Option<usize>, AppError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(AppError::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
