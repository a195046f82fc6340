use serde::{Deserialize, Serialize};

use crate::geom::{Offset, Position};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub remaining: Option<u8>, // Percent 0-100
    pub raw: Option<String>,
}

impl BatteryStatus {
    /// Parses the textual reply to `battery?`. Anything that is not a
    /// percentage is kept in `raw` only.
    pub fn from_reply(reply: &str) -> Self {
        let raw = reply.trim();
        let remaining = raw.parse::<u8>().ok().filter(|p| *p <= 100);
        Self { remaining, raw: Some(raw.to_string()) }
    }
}

/// Result of driving toward one waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachOutcome {
    pub target: Position,
    pub reached: bool,
    pub attempts: u32,
    pub last_position: Option<Position>,
    pub final_offset: Option<Offset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub ts_unix_ms: i64,
    pub waypoints: Vec<ReachOutcome>,
    pub last_attempted: Option<Position>,
    pub fix_timed_out: bool,
    pub battery: Option<BatteryStatus>,
    pub final_position: Option<Position>,
}

impl MissionReport {
    pub fn reached_count(&self) -> usize {
        self.waypoints.iter().filter(|w| w.reached).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(MissionReport),
    Aborted { ts_unix_ms: i64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_reply_parsing() {
        assert_eq!(BatteryStatus::from_reply("87\r\n").remaining, Some(87));
        assert_eq!(BatteryStatus::from_reply("error").remaining, None);
        assert_eq!(BatteryStatus::from_reply("180").remaining, None);
    }

    #[test]
    fn aborted_cycle_is_tagged() {
        let out = CycleOutcome::Aborted { ts_unix_ms: 1, reason: "stream".into() };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["outcome"], "aborted");
        assert_eq!(json["reason"], "stream");
    }
}
