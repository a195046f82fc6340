pub mod state;
pub mod udp;

use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

/// Datagram link to the drone's SDK port.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Drone command endpoint. 192.168.10.1:8889 on the stock Tello AP.
    #[serde(default = "default_drone_addr")]
    pub drone_addr: String,

    /// Local bind address. Replies come back to this socket.
    #[serde(default = "default_local_addr")]
    pub local_addr: String,

    /// Per-command reply timeout. Absent means wait for the reply forever.
    pub response_timeout_ms: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            drone_addr: default_drone_addr(),
            local_addr: default_local_addr(),
            response_timeout_ms: None,
        }
    }
}

fn default_drone_addr() -> String {
    "192.168.10.1:8889".into()
}

fn default_local_addr() -> String {
    "0.0.0.0:8889".into()
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link not connected")]
    NotConnected,
    #[error("invalid address {0:?}")]
    BadAddress(String),
    #[error("no reply to {command:?} within {after_ms}ms")]
    Timeout { command: String, after_ms: u64 },
    #[error("link i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous request/response command channel to the drone.
///
/// Callers must `connect` before the first `send_command`; implementations
/// return [`LinkError::NotConnected`] otherwise.
pub trait Transport: Send {
    fn connect(&mut self) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Sends one SDK text command and returns the drone's textual reply
    /// (`"ok"`, `"error"`, or a telemetry value such as a battery percentage).
    fn send_command(&mut self, text: &str) -> impl Future<Output = Result<String, LinkError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), LinkError>> + Send;
}
