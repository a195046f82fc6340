pub mod arrival;
pub mod doctor;
pub mod geometry;
pub mod mission;
pub mod queue;
pub mod retry;
pub mod shaper;

mod pacing;
#[cfg(test)]
mod testkit;

use hop_proto::Position;
use serde::Deserialize;
use std::time::Duration;

pub use arrival::{is_close_enough, Tolerance};
pub use geometry::{GeometryConfig, NavigationGeometry, PixelGeometry};
pub use mission::{MissionController, MissionState};
pub use queue::{MissionQueue, WaypointSource};
pub use retry::RetryScheduler;
pub use shaper::{CommandShaper, ShapingConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct MissionConfig {
    /// Pacing between SDK commands and the mission poll interval.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Poll interval while waiting for the first vision fix.
    #[serde(default = "default_delay_ms")]
    pub fix_poll_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Climb after takeoff, cm.
    #[serde(default = "default_takeoff_up_cm")]
    pub takeoff_up_cm: u32,

    /// Give up waiting for the first fix after this long and land.
    /// Absent means wait forever.
    pub fix_timeout_ms: Option<u64>,

    /// Pause before re-arming after an aborted cycle.
    #[serde(default = "default_abort_backoff_ms")]
    pub abort_backoff_ms: u64,

    /// Optional JSON-lines file receiving one report per cycle.
    pub report_path: Option<String>,

    /// Mission armed at startup, as [[x, y], ...].
    #[serde(default)]
    pub waypoints: Vec<[f64; 2]>,

    #[serde(default)]
    pub shaping: ShapingConfig,

    #[serde(default)]
    pub tolerance: Tolerance,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            fix_poll_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            takeoff_up_cm: default_takeoff_up_cm(),
            fix_timeout_ms: None,
            abort_backoff_ms: default_abort_backoff_ms(),
            report_path: None,
            waypoints: Vec::new(),
            shaping: ShapingConfig::default(),
            tolerance: Tolerance::default(),
        }
    }
}

impl MissionConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn initial_waypoints(&self) -> Vec<Position> {
        self.waypoints.iter().map(|[x, y]| Position::new(*x, *y)).collect()
    }
}

fn default_delay_ms() -> u64 {
    100
}
fn default_max_retries() -> u32 {
    3
}
fn default_takeoff_up_cm() -> u32 {
    150
}
fn default_abort_backoff_ms() -> u64 {
    2000
}

pub(crate) fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
