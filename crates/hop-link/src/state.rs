use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    pub connected: bool,
    pub peer: Option<String>,
    pub commands_sent: u64,
    pub last_command: Option<String>,
    pub last_reply: Option<String>,
    pub last_reply_at: Option<Instant>,
}

impl LinkStatus {
    pub fn reply_age(&self) -> Option<Duration> {
        self.last_reply_at.map(|t| t.elapsed())
    }
}
