use anyhow::Result;
use hop_proto::Position;
use serde::Deserialize;
use thiserror::Error;

use crate::{geometry::GeometryConfig, MissionConfig};

pub fn check_mission(cfg: &MissionConfig) -> Result<()> {
    anyhow::ensure!(cfg.max_retries >= 1, "mission.max_retries must be >= 1");
    anyhow::ensure!(cfg.delay_ms <= 5_000, "mission.delay_ms above 5s");
    anyhow::ensure!(cfg.fix_poll_ms >= 1, "mission.fix_poll_ms must be >= 1");
    anyhow::ensure!(
        (20..=500).contains(&cfg.takeoff_up_cm),
        "mission.takeoff_up_cm should be 20..500"
    );
    anyhow::ensure!(
        cfg.shaping.min_value > cfg.shaping.skip_threshold,
        "mission.shaping.min_value must exceed skip_threshold"
    );
    anyhow::ensure!(
        cfg.tolerance.x > 0.0 && cfg.tolerance.y > 0.0,
        "mission.tolerance must be positive"
    );
    if let Some(t) = cfg.fix_timeout_ms {
        anyhow::ensure!(t >= cfg.fix_poll_ms, "mission.fix_timeout_ms shorter than one poll");
    }
    Ok(())
}

pub fn check_geometry(cfg: &GeometryConfig) -> Result<()> {
    anyhow::ensure!(
        cfg.cm_per_px_x > 0.0 && cfg.cm_per_px_y > 0.0,
        "geometry.cm_per_px must be positive"
    );
    anyhow::ensure!((20..=500).contains(&cfg.max_step_cm), "geometry.max_step_cm should be 20..500");
    Ok(())
}

/// Spacing rules applied when a route is authored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WaypointRules {
    #[serde(default = "default_frame_w")]
    pub frame_w: f64,
    #[serde(default = "default_frame_h")]
    pub frame_h: f64,
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,
    #[serde(default = "default_min_delta_x")]
    pub min_delta_x: f64,
    #[serde(default = "default_min_delta_y")]
    pub min_delta_y: f64,
}

impl Default for WaypointRules {
    fn default() -> Self {
        Self {
            frame_w: default_frame_w(),
            frame_h: default_frame_h(),
            edge_margin: default_edge_margin(),
            min_delta_x: default_min_delta_x(),
            min_delta_y: default_min_delta_y(),
        }
    }
}

fn default_frame_w() -> f64 {
    1920.0
}
fn default_frame_h() -> f64 {
    1080.0
}
fn default_edge_margin() -> f64 {
    150.0
}
fn default_min_delta_x() -> f64 {
    256.0
}
fn default_min_delta_y() -> f64 {
    144.0
}

#[derive(Debug, Error, PartialEq)]
pub enum WaypointError {
    #[error("mission has no waypoints")]
    Empty,
    #[error("waypoint {index} has a non-finite coordinate")]
    NonFinite { index: usize },
    #[error("waypoint {index} {pos} is inside the {margin}px edge margin")]
    OutsideMargin { index: usize, pos: Position, margin: f64 },
    #[error("waypoint {index} {pos} is too close to the previous one")]
    TooClose { index: usize, pos: Position },
}

/// Every waypoint must be finite, must clear the frame edge margin, and each one must move
/// at least the minimum spacing on one axis from its predecessor.
pub fn validate_waypoints(rules: &WaypointRules, wps: &[Position]) -> Result<(), WaypointError> {
    if wps.is_empty() {
        return Err(WaypointError::Empty);
    }
    // NaN slips through every comparison below
    if let Some(index) = wps.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(WaypointError::NonFinite { index });
    }
    let m = rules.edge_margin;
    for (index, p) in wps.iter().enumerate() {
        if p.x < m || p.x > rules.frame_w - m || p.y < m || p.y > rules.frame_h - m {
            return Err(WaypointError::OutsideMargin { index, pos: *p, margin: m });
        }
    }
    for (i, pair) in wps.windows(2).enumerate() {
        let dx = (pair[1].x - pair[0].x).abs();
        let dy = (pair[1].y - pair[0].y).abs();
        if dx < rules.min_delta_x && dy < rules.min_delta_y {
            return Err(WaypointError::TooClose { index: i + 1, pos: pair[1] });
        }
    }
    Ok(())
}
