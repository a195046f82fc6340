use serde::Deserialize;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_player")]
    pub player: String, // ffplay-compatible
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Window placement; player default when absent.
    pub left: Option<i32>,
    pub top: Option<i32>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            player: default_player(),
            stream_url: default_stream_url(),
            width: default_width(),
            height: default_height(),
            left: None,
            top: None,
        }
    }
}

fn default_enable() -> bool {
    true
}
fn default_player() -> String {
    "ffplay".into()
}
fn default_stream_url() -> String {
    "udp://0.0.0.0:11111".into()
}
fn default_width() -> u32 {
    320
}
fn default_height() -> u32 {
    240
}

/// Consumer of the drone's video stream. `start` is fire-and-forget: the
/// mission never waits on or monitors the video path.
pub trait VideoSink: Send {
    fn start(&mut self);
}

/// Does nothing; used when video is disabled.
#[derive(Debug, Default)]
pub struct NullSink;

impl VideoSink for NullSink {
    fn start(&mut self) {
        debug!("video: disabled");
    }
}

/// Borderless, always-on-top picture-in-picture window via an external player.
pub struct PlayerSink {
    cfg: VideoConfig,
    child: Option<Child>,
}

impl PlayerSink {
    pub fn new(cfg: VideoConfig) -> Self {
        Self { cfg, child: None }
    }

    fn running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(c) => matches!(c.try_wait(), Ok(None)),
            None => false,
        }
    }
}

pub fn player_args(cfg: &VideoConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner", "-loglevel", "error",
        "-fflags", "nobuffer",
        "-flags", "low_delay",
        "-noborder",
        "-alwaysontop",
        "-window_title", "NAVhop feed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend(["-x".into(), cfg.width.to_string(), "-y".into(), cfg.height.to_string()]);
    if let Some(l) = cfg.left {
        args.extend(["-left".into(), l.to_string()]);
    }
    if let Some(t) = cfg.top {
        args.extend(["-top".into(), t.to_string()]);
    }
    args.push(cfg.stream_url.clone());
    args
}

impl VideoSink for PlayerSink {
    fn start(&mut self) {
        if self.running() {
            debug!("video: player already running");
            return;
        }
        let mut cmd = Command::new(&self.cfg.player);
        cmd.args(player_args(&self.cfg))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);

        match cmd.spawn() {
            Ok(child) => {
                info!("video: {} on {}", self.cfg.player, self.cfg.stream_url);
                self.child = Some(child);
            }
            Err(e) => warn!("video: failed to start {}: {}", self.cfg.player, e),
        }
    }
}

/// Picks the sink matching the config.
pub fn sink_from_config(cfg: &VideoConfig) -> Box<dyn VideoSink> {
    if cfg.enable {
        Box::new(PlayerSink::new(cfg.clone()))
    } else {
        Box::new(NullSink)
    }
}

impl VideoSink for Box<dyn VideoSink> {
    fn start(&mut self) {
        (**self).start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pip_window_args() {
        let cfg = VideoConfig { left: Some(1600), top: Some(840), ..VideoConfig::default() };
        let args = player_args(&cfg);
        let joined = args.join(" ");
        assert!(joined.contains("-x 320 -y 240"));
        assert!(joined.contains("-left 1600 -top 840"));
        assert_eq!(args.last().map(String::as_str), Some("udp://0.0.0.0:11111"));
    }

    #[test]
    fn placement_is_optional() {
        let args = player_args(&VideoConfig::default());
        assert!(!args.iter().any(|a| a == "-left" || a == "-top"));
    }

    #[tokio::test]
    async fn missing_player_is_not_fatal() {
        let mut sink = PlayerSink::new(VideoConfig {
            player: "/nonexistent/hop-player".into(),
            ..VideoConfig::default()
        });
        sink.start();
        assert!(sink.child.is_none());
    }
}
