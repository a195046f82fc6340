use hop_link::{LinkError, Transport};
use hop_proto::{telemetry::ReachOutcome, Command, Position};
use hop_vision::VisionSource;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{arrival::Tolerance, geometry::NavigationGeometry, pacing::send_paced, shaper::CommandShaper};

/// Bounded convergence on a single waypoint.
///
/// Each attempt corrects one axis at a time: forward/back from a fresh fix,
/// then left/right from another fresh fix, then checks arrival. The vision
/// fix lags the drone, so a combined move would be judged on stale data.
pub struct RetryScheduler<G> {
    shaper: CommandShaper,
    geometry: G,
    tolerance: Tolerance,
    delay: Duration,
    max_retries: u32,
}

struct Attempt {
    reached: bool,
    last_position: Option<Position>,
}

impl Attempt {
    fn missed(last_position: Option<Position>) -> Self {
        Self { reached: false, last_position }
    }
}

impl<G: NavigationGeometry> RetryScheduler<G> {
    pub fn new(shaper: CommandShaper, geometry: G, tolerance: Tolerance, delay: Duration, max_retries: u32) -> Self {
        Self { shaper, geometry, tolerance, delay, max_retries }
    }

    /// Runs up to `max_retries` attempts and stops at the first arrival.
    /// Exhaustion is reported in the outcome, never as an error.
    pub async fn reach<T: Transport, V: VisionSource>(
        &self,
        transport: &mut T,
        vision: &V,
        target: Position,
    ) -> ReachOutcome {
        let mut last_position = None;
        for attempt in 1..=self.max_retries {
            let a = self.attempt(transport, vision, &target).await;
            last_position = a.last_position.or(last_position);
            if a.reached {
                info!("nav: destination {} reached on attempt {}", target, attempt);
                return self.outcome(target, true, attempt, last_position);
            }
            info!("nav: retry {}/{} for {}", attempt, self.max_retries, target);
        }
        warn!("nav: failed to reach {} after {} attempts", target, self.max_retries);
        self.outcome(target, false, self.max_retries, last_position)
    }

    fn outcome(&self, target: Position, reached: bool, attempts: u32, last: Option<Position>) -> ReachOutcome {
        ReachOutcome {
            target,
            reached,
            attempts,
            last_position: last,
            final_offset: last.map(|p| p.offset_to(&target)),
        }
    }

    async fn attempt<T: Transport, V: VisionSource>(&self, transport: &mut T, vision: &V, target: &Position) -> Attempt {
        // settle before sampling
        tokio::time::sleep(self.delay).await;

        let Some(loc) = vision.current_position() else {
            warn!("nav: no vision data; skipping move");
            return Attempt::missed(None);
        };
        let (primary, secondary) = self.geometry.commands_for(&loc, target);
        debug!("nav: from {} computed {}, {}", loc, primary, secondary);
        if let Err(e) = self.transmit(transport, primary).await {
            warn!("nav: primary move failed: {}", e);
            return Attempt::missed(Some(loc));
        }

        // The primary move changed the drone's position; resample.
        let Some(loc) = vision.current_position() else {
            warn!("nav: vision fix lost after primary move");
            return Attempt::missed(Some(loc));
        };
        let (_, secondary) = self.geometry.commands_for(&loc, target);
        debug!("nav: from {} sideways {}", loc, secondary);
        if let Err(e) = self.transmit(transport, secondary).await {
            warn!("nav: secondary move failed: {}", e);
            return Attempt::missed(Some(loc));
        }

        let final_loc = vision.current_position();
        let reached = self.tolerance.accepts(final_loc, *target);
        match final_loc {
            Some(p) => info!("nav: final {} target {} reached={}", p, target, reached),
            None => info!("nav: final position unknown, target {}", target),
        }
        Attempt { reached, last_position: final_loc.or(Some(loc)) }
    }

    async fn transmit<T: Transport>(&self, transport: &mut T, cmd: Command) -> Result<(), LinkError> {
        let Some(shaped) = self.shaper.shape_command(cmd) else {
            return Ok(());
        };
        let reply = send_paced(transport, &shaped.to_string(), self.delay).await?;
        if reply != "ok" {
            warn!("nav: {} answered {:?}", shaped, reply);
        }
        Ok(())
    }
}
