use serde::{Deserialize, Serialize};

/// Point in the vision frame (pixels, y grows "forward").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Signed per-axis offset from `self` to `target`.
    pub fn offset_to(&self, target: &Position) -> Offset {
        Offset { dx: target.x - self.x, dy: target.y - self.y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.0}, {:.0})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub fn within(&self, x_tol: f64, y_tol: f64) -> bool {
        self.dx.abs() <= x_tol && self.dy.abs() <= y_tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_target_minus_current() {
        let cur = Position::new(100.0, 250.0);
        let off = cur.offset_to(&Position::new(40.0, 300.0));
        assert_eq!(off, Offset { dx: -60.0, dy: 50.0 });
    }

    #[test]
    fn within_checks_each_axis_independently() {
        let off = Offset { dx: -128.0, dy: 72.0 };
        assert!(off.within(128.0, 72.0));
        assert!(!off.within(127.0, 72.0));
        assert!(!off.within(128.0, 71.5));
    }
}
