use hop_link::Transport;
use hop_proto::telemetry::{BatteryStatus, CycleOutcome, MissionReport};
use hop_proto::Position;
use hop_vision::{video::VideoSink, VisionSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    geometry::NavigationGeometry, now_unix_ms, pacing::send_paced, queue::WaypointSource, retry::RetryScheduler,
    shaper::CommandShaper, MissionConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    AwaitingMission,
    StreamStarting,
    TakingOff,
    AwaitingFix,
    Navigating,
    Landing,
}

/// Runs mission cycles: wait for a mission, bring up link and video, take
/// off, visit every waypoint, land, reset. One cycle at a time.
pub struct MissionController<T, V, W, S, G> {
    transport: T,
    vision: V,
    waypoints: W,
    video: S,
    scheduler: RetryScheduler<G>,

    delay: Duration,
    fix_poll: Duration,
    fix_timeout: Option<Duration>,
    abort_backoff: Duration,
    takeoff_up_cm: u32,

    state: MissionState,
    connected: bool,
}

impl<T, V, W, S, G> MissionController<T, V, W, S, G>
where
    T: Transport,
    V: VisionSource,
    W: WaypointSource,
    S: VideoSink,
    G: NavigationGeometry,
{
    pub fn new(transport: T, vision: V, waypoints: W, video: S, geometry: G, cfg: &MissionConfig) -> Self {
        let delay = cfg.delay();
        Self {
            transport,
            vision,
            waypoints,
            video,
            scheduler: RetryScheduler::new(
                CommandShaper::new(cfg.shaping),
                geometry,
                cfg.tolerance,
                delay,
                cfg.max_retries,
            ),
            delay,
            fix_poll: Duration::from_millis(cfg.fix_poll_ms),
            fix_timeout: cfg.fix_timeout_ms.map(Duration::from_millis),
            abort_backoff: Duration::from_millis(cfg.abort_backoff_ms),
            takeoff_up_cm: cfg.takeoff_up_cm,
            state: MissionState::AwaitingMission,
            connected: false,
        }
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    fn enter(&mut self, next: MissionState) {
        if self.state != next {
            info!("mission: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Cycles until the waypoint source closes. Every cycle outcome is
    /// forwarded to `reports` when given.
    pub async fn run(&mut self, reports: Option<mpsc::Sender<CycleOutcome>>) {
        info!("mission: controller running");
        loop {
            let Some(outcome) = self.run_cycle().await else {
                info!("mission: waypoint source closed, stopping");
                return;
            };
            let aborted = matches!(outcome, CycleOutcome::Aborted { .. });
            if let Some(tx) = &reports {
                if tx.send(outcome).await.is_err() {
                    warn!("mission: report consumer gone");
                }
            }
            if aborted {
                tokio::time::sleep(self.abort_backoff).await;
            }
        }
    }

    /// One full cycle. `None` when no mission can arrive any more.
    pub async fn run_cycle(&mut self) -> Option<CycleOutcome> {
        self.enter(MissionState::AwaitingMission);
        info!("mission: awaiting destination list");
        let mission = self.waypoints.wait_for_mission(self.delay).await?;
        info!("mission: {} waypoints armed", mission.len());

        self.enter(MissionState::StreamStarting);
        if let Err(reason) = self.start_stream().await {
            warn!("mission: {}", reason);
            self.close_link().await;
            self.enter(MissionState::AwaitingMission);
            return Some(CycleOutcome::Aborted { ts_unix_ms: now_unix_ms(), reason });
        }

        self.enter(MissionState::TakingOff);
        self.takeoff().await;

        self.enter(MissionState::AwaitingFix);
        let has_fix = self.await_fix().await;

        let mut outcomes = Vec::with_capacity(mission.len());
        let mut last_attempted = None;
        if has_fix {
            self.enter(MissionState::Navigating);
            for (i, wp) in mission.iter().enumerate() {
                info!("mission: waypoint {}/{} {}", i + 1, mission.len(), wp);
                let out = self.scheduler.reach(&mut self.transport, &self.vision, *wp).await;
                outcomes.push(out);
                last_attempted = Some(*wp);
            }
        }

        self.enter(MissionState::Landing);
        let (battery, final_position) = self.land().await;
        self.enter(MissionState::AwaitingMission);

        let report = MissionReport {
            ts_unix_ms: now_unix_ms(),
            waypoints: outcomes,
            last_attempted,
            fix_timed_out: !has_fix,
            battery,
            final_position,
        };
        info!(
            "mission: cycle complete, {}/{} waypoints reached",
            report.reached_count(),
            mission.len()
        );
        Some(CycleOutcome::Completed(report))
    }

    async fn start_stream(&mut self) -> Result<(), String> {
        self.transport.connect().await.map_err(|e| format!("link connect failed: {}", e))?;
        self.connected = true;
        tokio::time::sleep(self.delay).await;

        send_paced(&mut self.transport, "command", self.delay)
            .await
            .map_err(|e| format!("sdk mode entry failed: {}", e))?;

        let reply = self
            .transport
            .send_command("streamon")
            .await
            .map_err(|e| format!("stream start failed: {}", e))?;
        if reply != "ok" {
            return Err(format!("stream start failed: reply {:?}", reply));
        }

        self.video.start();
        info!("mission: stream started");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn takeoff(&mut self) {
        info!("mission: takeoff sequence");
        let up = format!("up {}", self.takeoff_up_cm);
        for cmd in ["command", "takeoff", up.as_str()] {
            if let Err(e) = send_paced(&mut self.transport, cmd, self.delay).await {
                warn!("mission: {} failed: {}", cmd, e);
            }
        }
    }

    /// False when the configured fix timeout ran out or vision went away.
    async fn await_fix(&mut self) -> bool {
        info!("mission: waiting for vision fix");
        let timeout = self.fix_timeout;
        let wait = self.vision.wait_for_fix(self.fix_poll);
        let fix = match timeout {
            Some(t) => tokio::time::timeout(t, wait).await.ok().flatten(),
            None => wait.await,
        };
        match fix {
            Some(p) => {
                info!("mission: first fix {}", p);
                true
            }
            None => {
                warn!("mission: no vision fix, skipping navigation");
                false
            }
        }
    }

    async fn land(&mut self) -> (Option<BatteryStatus>, Option<Position>) {
        let battery = match self.transport.send_command("battery?").await {
            Ok(reply) => {
                let b = BatteryStatus::from_reply(&reply);
                info!("mission: battery {}", b.raw.as_deref().unwrap_or("?"));
                Some(b)
            }
            Err(e) => {
                warn!("mission: battery query failed: {}", e);
                None
            }
        };
        let final_position = self.vision.current_position();
        match final_position {
            Some(p) => info!("mission: final position {}", p),
            None => info!("mission: final position unknown"),
        }

        tokio::time::sleep(self.delay).await;
        if let Err(e) = send_paced(&mut self.transport, "land", self.delay).await {
            warn!("mission: land failed: {}", e);
        }
        self.close_link().await;
        self.waypoints.clear_mission();
        (battery, final_position)
    }

    async fn close_link(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.transport.close().await {
            warn!("mission: link close failed: {}", e);
        }
        self.connected = false;
    }
}
