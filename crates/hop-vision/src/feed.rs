use anyhow::{Context, Result};
use hop_proto::Position;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::{PositionPublisher, VisionConfig};

const MAX_DATAGRAM: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixUpdate {
    Fix(Position),
    Lost,
}

#[derive(Debug, Error, PartialEq)]
pub enum FixParseError {
    #[error("unrecognized fix line {0:?}")]
    Unrecognized(String),
    #[error("non-finite coordinate in {0:?}")]
    NonFinite(String),
}

/// Where fixes come from: the live pose estimator over UDP, or a recording.
pub enum FixSource {
    Udp(UdpSocket),
    File { reader: BufReader<File>, interval: Duration },
}

impl FixSource {
    pub async fn udp(addr: &str) -> Result<Self> {
        let sock = UdpSocket::bind(addr).await.with_context(|| format!("bind fix socket {}", addr))?;
        info!("vision: listening for fixes on {}", sock.local_addr()?);
        Ok(Self::Udp(sock))
    }

    pub async fn file(path: &str, interval: Duration) -> Result<Self> {
        let f = File::open(path).await.with_context(|| format!("open fix replay {}", path))?;
        Ok(Self::File { reader: BufReader::new(f), interval })
    }

    pub async fn from_config(cfg: &VisionConfig) -> Result<Self> {
        match cfg.source.as_str() {
            "udp" => Self::udp(&cfg.listen_addr).await,
            "file" => {
                let path = cfg.replay_file.as_ref().context("vision.replay_file missing")?;
                let interval = Duration::from_millis(cfg.replay_interval_ms.unwrap_or(100));
                Self::file(path, interval).await
            }
            other => anyhow::bail!("unknown vision.source: {}", other),
        }
    }

    /// Next well-formed update. Malformed input is logged and skipped.
    pub async fn next_update(&mut self) -> Result<FixUpdate> {
        loop {
            let line = match self {
                FixSource::Udp(sock) => {
                    let mut buf = [0u8; MAX_DATAGRAM];
                    let n = sock.recv(&mut buf).await.context("recv fix datagram")?;
                    String::from_utf8_lossy(&buf[..n]).into_owned()
                }
                FixSource::File { reader, interval } => {
                    let mut line = String::new();
                    let n = reader.read_line(&mut line).await?;
                    if n == 0 {
                        // EOF: keep following the file
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        continue;
                    }
                    tokio::time::sleep(*interval).await;
                    line
                }
            };
            match parse_fix_line(line.trim()) {
                Ok(Some(up)) => return Ok(up),
                Ok(None) => continue,
                Err(e) => warn!("vision: {}", e),
            }
        }
    }
}

#[derive(Deserialize)]
struct JsonFix {
    x: f64,
    y: f64,
}

/// Accepts `x,y`, `x y`, `{"x":..,"y":..}` and `none`. Blank lines and
/// `#` comments yield `Ok(None)`.
pub fn parse_fix_line(s: &str) -> Result<Option<FixUpdate>, FixParseError> {
    if s.is_empty() || s.starts_with('#') {
        return Ok(None);
    }
    if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("lost") {
        return Ok(Some(FixUpdate::Lost));
    }

    let (x, y) = if s.starts_with('{') {
        let j: JsonFix = serde_json::from_str(s).map_err(|_| FixParseError::Unrecognized(s.to_string()))?;
        (j.x, j.y)
    } else {
        let mut parts = s.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty());
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(FixParseError::Unrecognized(s.to_string()));
        };
        let x: f64 = x.parse().map_err(|_| FixParseError::Unrecognized(s.to_string()))?;
        let y: f64 = y.parse().map_err(|_| FixParseError::Unrecognized(s.to_string()))?;
        (x, y)
    };

    if !x.is_finite() || !y.is_finite() {
        return Err(FixParseError::NonFinite(s.to_string()));
    }
    Ok(Some(FixUpdate::Fix(Position::new(x, y))))
}

/// Pumps a fix source into the shared position cell until the source fails.
pub async fn run_feed(mut src: FixSource, publisher: PositionPublisher) -> Result<()> {
    let mut seen_first = false;
    loop {
        match src.next_update().await? {
            FixUpdate::Fix(pos) => {
                if !seen_first {
                    info!("vision: first fix {}", pos);
                    seen_first = true;
                }
                debug!("vision: fix {}", pos);
                publisher.publish(pos);
            }
            FixUpdate::Lost => {
                debug!("vision: fix lost");
                publisher.clear();
            }
        }
    }
}
