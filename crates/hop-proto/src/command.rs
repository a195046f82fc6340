use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Movement directions accepted by the drone SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    /// Rotate clockwise (degrees).
    Cw,
    /// Rotate counter-clockwise (degrees).
    Ccw,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Back => "back",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Cw => "cw",
            Direction::Ccw => "ccw",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "forward" => Direction::Forward,
            "back" => Direction::Back,
            "left" => Direction::Left,
            "right" => Direction::Right,
            "up" => Direction::Up,
            "down" => Direction::Down,
            "cw" => Direction::Cw,
            "ccw" => Direction::Ccw,
            other => return Err(ParseCommandError::UnknownDirection(other.to_string())),
        })
    }
}

/// A single movement order. Text form is `"<direction> <magnitude>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub direction: Direction,
    pub magnitude: u32,
}

impl Command {
    pub const fn new(direction: Direction, magnitude: u32) -> Self {
        Self { direction, magnitude }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.magnitude)
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(dir), Some(val), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ParseCommandError::Malformed(s.to_string()));
        };
        let magnitude = val
            .parse()
            .map_err(|_| ParseCommandError::BadMagnitude(val.to_string()))?;
        Ok(Self { direction: dir.parse()?, magnitude })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("expected '<direction> <value>', got {0:?}")]
    Malformed(String),
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    #[error("magnitude {0:?} is not a non-negative integer")]
    BadMagnitude(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_matches_sdk() {
        assert_eq!(Command::new(Direction::Forward, 20).to_string(), "forward 20");
        assert_eq!(Command::new(Direction::Ccw, 90).to_string(), "ccw 90");
    }

    #[test]
    fn parses_sdk_text() {
        let cmd: Command = "left 35".parse().unwrap();
        assert_eq!(cmd, Command::new(Direction::Left, 35));
        let cmd: Command = "  up   150 ".parse().unwrap();
        assert_eq!(cmd, Command::new(Direction::Up, 150));
    }

    #[test]
    fn rejects_bad_text() {
        assert!(matches!("forward".parse::<Command>(), Err(ParseCommandError::Malformed(_))));
        assert!(matches!("forward 1 2".parse::<Command>(), Err(ParseCommandError::Malformed(_))));
        assert!(matches!("sideways 10".parse::<Command>(), Err(ParseCommandError::UnknownDirection(_))));
        assert!(matches!("back -3".parse::<Command>(), Err(ParseCommandError::BadMagnitude(_))));
    }
}
