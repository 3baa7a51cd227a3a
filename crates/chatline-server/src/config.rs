use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use chatline_api::DEFAULT_MAX_BODY_BYTES;

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub realtime_api_key: Option<String>,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("CHATLINE_DB_PATH").unwrap_or_else(|| "chatline.db".into());
        let host = lookup("CHATLINE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("CHATLINE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("CHATLINE_PORT must be a port number")?;
        let max_body_bytes = match lookup("CHATLINE_MAX_BODY_BYTES") {
            Some(v) => v.parse().context("CHATLINE_MAX_BODY_BYTES must be a byte count")?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        let realtime_api_key = lookup("CHATLINE_REALTIME_API_KEY").filter(|k| !k.is_empty());

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        Ok(Self {
            db_path: db_path.into(),
            addr,
            realtime_api_key,
            max_body_bytes,
        })
    }
}
