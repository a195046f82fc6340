//! Test doubles for the mission collaborators.

use hop_link::{LinkError, Transport};
use hop_proto::{Command, Direction, Position};
use hop_vision::VisionSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::queue::WaypointSource;

#[derive(Debug, Default)]
pub(crate) struct LinkLog {
    pub sent: Vec<String>,
    pub connects: usize,
    pub closes: usize,
    pub sent_while_closed: usize,
}

impl LinkLog {
    pub fn moves(&self) -> Vec<String> {
        self.sent.iter().filter(|c| c.parse::<Command>().is_ok()).cloned().collect()
    }
}

/// Replies "ok" to everything except `streamon` (scriptable) and `battery?`.
pub(crate) struct ScriptTransport {
    log: Arc<Mutex<LinkLog>>,
    connected: bool,
    pub stream_reply: &'static str,
    pub fail_connect: bool,
    pub drone: Option<Arc<Mutex<SimDrone>>>,
}

impl ScriptTransport {
    pub fn new() -> (Self, Arc<Mutex<LinkLog>>) {
        let log = Arc::new(Mutex::new(LinkLog::default()));
        let t = Self { log: log.clone(), connected: false, stream_reply: "ok", fail_connect: false, drone: None };
        (t, log)
    }
}

impl Transport for ScriptTransport {
    async fn connect(&mut self) -> Result<(), LinkError> {
        if self.fail_connect {
            return Err(LinkError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")));
        }
        self.connected = true;
        self.log.lock().unwrap().connects += 1;
        Ok(())
    }

    async fn send_command(&mut self, text: &str) -> Result<String, LinkError> {
        let mut log = self.log.lock().unwrap();
        if !self.connected {
            log.sent_while_closed += 1;
            return Err(LinkError::NotConnected);
        }
        log.sent.push(text.to_string());
        if let (Some(drone), Ok(cmd)) = (&self.drone, text.parse::<Command>()) {
            drone.lock().unwrap().apply(cmd);
        }
        Ok(match text {
            "streamon" => self.stream_reply.to_string(),
            "battery?" => "76".to_string(),
            _ => "ok".to_string(),
        })
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.connected = false;
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Returns scripted readings in order, then keeps repeating the last one.
pub(crate) struct ScriptVision {
    script: Mutex<VecDeque<Option<Position>>>,
    last: Mutex<Option<Position>>,
    pub reads: Arc<AtomicUsize>,
}

impl ScriptVision {
    pub fn new(script: Vec<Option<Position>>) -> Self {
        Self { script: Mutex::new(script.into()), last: Mutex::new(None), reads: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn fixed(p: Position) -> Self {
        Self::new(vec![Some(p)])
    }

    /// One attempt samples the position three times: before the primary
    /// move, before the secondary move, and for the arrival check.
    pub fn per_attempt(attempts: &[[(f64, f64); 3]]) -> Self {
        let script = attempts.iter().flatten().map(|&(x, y)| Some(Position::new(x, y))).collect();
        Self::new(script)
    }
}

impl VisionSource for ScriptVision {
    fn current_position(&self) -> Option<Position> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}

/// Drone that moves exactly as commanded. 1 cm = `px_per_cm` frame pixels.
pub(crate) struct SimDrone {
    pub pos: Position,
    pub px_per_cm: f64,
}

impl SimDrone {
    pub fn shared(pos: Position) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self { pos, px_per_cm: 2.0 }))
    }

    fn apply(&mut self, cmd: Command) {
        let d = cmd.magnitude as f64 * self.px_per_cm;
        match cmd.direction {
            Direction::Forward => self.pos.y += d,
            Direction::Back => self.pos.y -= d,
            Direction::Right => self.pos.x += d,
            Direction::Left => self.pos.x -= d,
            _ => {}
        }
    }
}

pub(crate) struct SimVision(pub Arc<Mutex<SimDrone>>);

impl VisionSource for SimVision {
    fn current_position(&self) -> Option<Position> {
        Some(self.0.lock().unwrap().pos)
    }
}

/// Hands out queued missions one cycle at a time and closes when empty.
pub(crate) struct CountingQueue {
    pending: Mutex<VecDeque<Vec<Position>>>,
    current: Mutex<Vec<Position>>,
    pub clears: Arc<AtomicUsize>,
}

impl CountingQueue {
    pub fn new(missions: Vec<Vec<Position>>) -> Self {
        Self {
            pending: Mutex::new(missions.into()),
            current: Mutex::new(Vec::new()),
            clears: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl WaypointSource for CountingQueue {
    fn mission_queue(&self) -> Vec<Position> {
        self.current.lock().unwrap().clone()
    }

    fn clear_mission(&self) {
        self.current.lock().unwrap().clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    async fn wait_for_mission(&mut self, _poll: Duration) -> Option<Vec<Position>> {
        let mut current = self.current.lock().unwrap();
        if current.is_empty() {
            *current = self.pending.lock().unwrap().pop_front()?;
        }
        Some(current.clone())
    }
}
