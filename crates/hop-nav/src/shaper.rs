use hop_proto::{Command, Direction};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ShapingConfig {
    /// Magnitudes at or below this are not worth sending.
    #[serde(default = "default_skip_threshold")]
    pub skip_threshold: u32,
    /// Smallest move the drone executes reliably.
    #[serde(default = "default_min_value")]
    pub min_value: u32,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self { skip_threshold: default_skip_threshold(), min_value: default_min_value() }
    }
}

fn default_skip_threshold() -> u32 {
    5
}
fn default_min_value() -> u32 {
    20
}

/// Turns a raw correction into something safe to transmit.
#[derive(Debug, Clone, Copy)]
pub struct CommandShaper {
    skip_threshold: u32,
    min_value: u32,
}

impl CommandShaper {
    pub fn new(cfg: ShapingConfig) -> Self {
        Self { skip_threshold: cfg.skip_threshold, min_value: cfg.min_value }
    }

    /// `None` for negligible moves; small moves are raised to the minimum;
    /// everything else passes through.
    pub fn shape(&self, direction: Direction, magnitude: u32) -> Option<Command> {
        if magnitude <= self.skip_threshold {
            debug!("shaper: skipping small movement {} {}", direction, magnitude);
            return None;
        }
        Some(Command::new(direction, magnitude.max(self.min_value)))
    }

    pub fn shape_command(&self, cmd: Command) -> Option<Command> {
        self.shape(cmd.direction, cmd.magnitude)
    }
}

impl Default for CommandShaper {
    fn default() -> Self {
        Self::new(ShapingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let s = CommandShaper::default();
        assert_eq!(s.shape(Direction::Forward, 3), None);
        assert_eq!(s.shape(Direction::Forward, 12), Some(Command::new(Direction::Forward, 20)));
        assert_eq!(s.shape(Direction::Forward, 50), Some(Command::new(Direction::Forward, 50)));
    }

    #[test]
    fn every_magnitude_lands_in_its_band() {
        let s = CommandShaper::default();
        for m in 0..=600 {
            let shaped = s.shape(Direction::Left, m);
            match m {
                0..=5 => assert_eq!(shaped, None, "m={m}"),
                6..=19 => assert_eq!(shaped.map(|c| c.magnitude), Some(20), "m={m}"),
                _ => assert_eq!(shaped.map(|c| c.magnitude), Some(m), "m={m}"),
            }
        }
    }

    #[test]
    fn boundaries_follow_config() {
        let s = CommandShaper::new(ShapingConfig { skip_threshold: 10, min_value: 30 });
        assert_eq!(s.shape(Direction::Back, 10), None);
        assert_eq!(s.shape(Direction::Back, 11).map(|c| c.magnitude), Some(30));
        assert_eq!(s.shape(Direction::Back, 30).map(|c| c.magnitude), Some(30));
        assert_eq!(s.shape_command(Command::new(Direction::Cw, 90)), Some(Command::new(Direction::Cw, 90)));
    }
}
