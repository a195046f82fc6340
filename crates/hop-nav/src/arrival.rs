use hop_proto::Position;
use serde::Deserialize;

/// Per-axis arrival tolerance in pixels. The defaults are half the minimum
/// spacing allowed between successive waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tolerance {
    #[serde(default = "default_x")]
    pub x: f64,
    #[serde(default = "default_y")]
    pub y: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { x: default_x(), y: default_y() }
    }
}

fn default_x() -> f64 {
    128.0
}
fn default_y() -> f64 {
    72.0
}

impl Tolerance {
    pub fn accepts(&self, current: Option<Position>, target: Position) -> bool {
        is_close_enough(current, Some(target), self.x, self.y)
    }
}

/// Axis-wise box test, not a radius: each axis is corrected by its own
/// command so each gets its own tolerance.
pub fn is_close_enough(current: Option<Position>, target: Option<Position>, x_tol: f64, y_tol: f64) -> bool {
    match (current, target) {
        (Some(c), Some(t)) => c.offset_to(&t).within(x_tol, y_tol),
        _ => false,
    }
}
