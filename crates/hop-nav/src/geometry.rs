use hop_proto::{Command, Direction, Position};
use serde::Deserialize;

/// Maps a pixel-space delta to a pair of movement commands.
pub trait NavigationGeometry: Send + Sync {
    /// Returns (primary, secondary): forward/back first, then left/right.
    fn commands_for(&self, current: &Position, target: &Position) -> (Command, Command);
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeometryConfig {
    /// Ground distance covered by one frame pixel, cm.
    #[serde(default = "default_scale")]
    pub cm_per_px_x: f64,
    #[serde(default = "default_scale")]
    pub cm_per_px_y: f64,
    /// Largest single move the SDK accepts, cm.
    #[serde(default = "default_max_step_cm")]
    pub max_step_cm: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { cm_per_px_x: default_scale(), cm_per_px_y: default_scale(), max_step_cm: default_max_step_cm() }
    }
}

fn default_scale() -> f64 {
    0.5
}
fn default_max_step_cm() -> u32 {
    500
}

/// Linear pixel-to-centimetre mapping for a downward-looking frame where
/// +y is the drone's forward direction and +x its right.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelGeometry {
    cfg: GeometryConfig,
}

impl PixelGeometry {
    pub fn new(cfg: GeometryConfig) -> Self {
        Self { cfg }
    }

    fn to_cm(&self, px: f64, cm_per_px: f64) -> u32 {
        let cm = (px.abs() * cm_per_px).round();
        cm.min(self.cfg.max_step_cm as f64) as u32
    }
}

impl NavigationGeometry for PixelGeometry {
    fn commands_for(&self, current: &Position, target: &Position) -> (Command, Command) {
        let off = current.offset_to(target);
        let fwd = if off.dy >= 0.0 { Direction::Forward } else { Direction::Back };
        let side = if off.dx >= 0.0 { Direction::Right } else { Direction::Left };
        (
            Command::new(fwd, self.to_cm(off.dy, self.cfg.cm_per_px_y)),
            Command::new(side, self.to_cm(off.dx, self.cfg.cm_per_px_x)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_follow_offset_sign() {
        let g = PixelGeometry::default();
        let (p, s) = g.commands_for(&Position::new(500.0, 500.0), &Position::new(700.0, 300.0));
        assert_eq!(p, Command::new(Direction::Back, 100));
        assert_eq!(s, Command::new(Direction::Right, 100));

        let (p, s) = g.commands_for(&Position::new(500.0, 500.0), &Position::new(441.0, 561.0));
        assert_eq!(p, Command::new(Direction::Forward, 31));
        assert_eq!(s, Command::new(Direction::Left, 30));
    }

    #[test]
    fn zero_offset_gives_zero_magnitude() {
        let g = PixelGeometry::default();
        let here = Position::new(10.0, 10.0);
        let (p, s) = g.commands_for(&here, &here);
        assert_eq!((p.magnitude, s.magnitude), (0, 0));
    }

    #[test]
    fn long_moves_are_capped() {
        let g = PixelGeometry::new(GeometryConfig { cm_per_px_x: 1.0, cm_per_px_y: 1.0, max_step_cm: 500 });
        let (p, s) = g.commands_for(&Position::new(0.0, 0.0), &Position::new(1800.0, 900.0));
        assert_eq!(p, Command::new(Direction::Forward, 500));
        assert_eq!(s, Command::new(Direction::Right, 500));
    }
}
