pub mod feed;
pub mod video;

use hop_proto::Position;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// "udp" | "file"
    #[serde(default = "default_source")]
    pub source: String,

    /// Where the pose estimator sends fixes (source = "udp").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Recorded fixes, one per line (source = "file").
    pub replay_file: Option<String>,
    pub replay_interval_ms: Option<u64>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            listen_addr: default_listen_addr(),
            replay_file: None,
            replay_interval_ms: None,
        }
    }
}

fn default_source() -> String {
    "udp".into()
}

fn default_listen_addr() -> String {
    "0.0.0.0:9100".into()
}

/// Latest position estimate from the vision pipeline.
pub trait VisionSource: Send + Sync {
    /// Non-blocking snapshot of the latest fix; `None` when there is no fix.
    fn current_position(&self) -> Option<Position>;

    /// Resolves with the first available fix, or `None` once the producer
    /// is gone. The default implementation polls every `poll`.
    fn wait_for_fix(&mut self, poll: Duration) -> impl Future<Output = Option<Position>> + Send {
        async move {
            loop {
                if let Some(p) = self.current_position() {
                    return Some(p);
                }
                tokio::time::sleep(poll).await;
            }
        }
    }
}

/// Creates a single-slot position cell. Every publish overwrites the
/// previous value; readers only ever see the latest one.
pub fn position_cell() -> (PositionPublisher, PositionReader) {
    let (tx, rx) = watch::channel(None);
    (PositionPublisher { tx: Arc::new(tx) }, PositionReader { rx })
}

#[derive(Debug, Clone)]
pub struct PositionPublisher {
    tx: Arc<watch::Sender<Option<Position>>>,
}

impl PositionPublisher {
    pub fn publish(&self, pos: Position) {
        self.tx.send_replace(Some(pos));
    }

    /// Marks the fix as lost.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

#[derive(Debug, Clone)]
pub struct PositionReader {
    rx: watch::Receiver<Option<Position>>,
}

impl VisionSource for PositionReader {
    fn current_position(&self) -> Option<Position> {
        *self.rx.borrow()
    }

    async fn wait_for_fix(&mut self, _poll: Duration) -> Option<Position> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(pos) => *pos,
            Err(_) => None,
        }
    }
}
