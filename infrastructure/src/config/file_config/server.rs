//! HTTP server configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Address to bind (default: "0.0.0.0").
    pub host: String,
    /// Port to bind (default: 8000).
    pub port: u16,
    /// Seconds between SSE keep-alive comments.
    pub keepalive_secs: u64,
    /// Capacity of each session's event channel.
    pub event_buffer: usize,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            keepalive_secs: 15,
            event_buffer: 64,
        }
    }
}

impl FileServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
