use hop_proto::Position;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Supplies missions to the controller.
///
/// Handoff: the producer fills the queue, the controller consumes the whole
/// queue in one cycle and calls `clear_mission` after landing.
pub trait WaypointSource: Send + Sync {
    fn mission_queue(&self) -> Vec<Position>;

    fn clear_mission(&self);

    /// Resolves with the queue contents once it is non-empty, or `None` if
    /// no further mission can arrive. The default implementation polls.
    fn wait_for_mission(&mut self, poll: Duration) -> impl Future<Output = Option<Vec<Position>>> + Send {
        async move {
            loop {
                let q = self.mission_queue();
                if !q.is_empty() {
                    return Some(q);
                }
                tokio::time::sleep(poll).await;
            }
        }
    }
}

/// Shared mission queue. Clones are handles to the same queue.
#[derive(Debug, Clone)]
pub struct MissionQueue {
    tx: Arc<watch::Sender<Vec<Position>>>,
    rx: watch::Receiver<Vec<Position>>,
}

impl Default for MissionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionQueue {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        Self { tx: Arc::new(tx), rx }
    }

    /// Arms a whole mission at once. Refused while a mission is pending or
    /// in flight, so the controller never sees a half-written route.
    pub fn arm(&self, waypoints: Vec<Position>) -> bool {
        if waypoints.is_empty() {
            return false;
        }
        let n = waypoints.len();
        let armed = self.tx.send_if_modified(|q| {
            if q.is_empty() {
                *q = waypoints;
                true
            } else {
                false
            }
        });
        if armed {
            info!("queue: armed mission with {} waypoints", n);
        } else {
            debug!("queue: mission in progress, arm refused");
        }
        armed
    }

    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.borrow().is_empty()
    }
}

impl WaypointSource for MissionQueue {
    fn mission_queue(&self) -> Vec<Position> {
        self.rx.borrow().clone()
    }

    fn clear_mission(&self) {
        self.tx.send_replace(Vec::new());
    }

    async fn wait_for_mission(&mut self, _poll: Duration) -> Option<Vec<Position>> {
        // The queue owns a sender, so the channel cannot close under us.
        match self.rx.wait_for(|q| !q.is_empty()).await {
            Ok(q) => Some(q.to_vec()),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Vec<Position> {
        vec![Position::new(300.0, 300.0), Position::new(600.0, 300.0)]
    }

    #[test]
    fn arm_only_when_idle() {
        let q = MissionQueue::new();
        assert!(!q.arm(Vec::new()));
        assert!(q.arm(route()));
        assert!(!q.arm(vec![Position::new(1.0, 1.0)]));
        assert_eq!(q.mission_queue(), route());

        q.clear_mission();
        assert!(q.is_empty());
        assert!(q.arm(vec![Position::new(1.0, 1.0)]));
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn waiter_sees_only_a_populated_queue() {
        let q = MissionQueue::new();
        let mut consumer = q.clone();
        let waiter = tokio::spawn(async move { consumer.wait_for_mission(Duration::from_millis(100)).await });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        q.arm(route());
        assert_eq!(waiter.await.unwrap(), Some(route()));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_default_waits_for_contents() {
        struct Slow(std::sync::Mutex<u32>);
        impl WaypointSource for Slow {
            fn mission_queue(&self) -> Vec<Position> {
                let mut n = self.0.lock().unwrap();
                *n += 1;
                if *n < 4 { Vec::new() } else { vec![Position::new(5.0, 5.0)] }
            }
            fn clear_mission(&self) {}
        }

        let mut src = Slow(std::sync::Mutex::new(0));
        let got = src.wait_for_mission(Duration::from_millis(100)).await;
        assert_eq!(got, Some(vec![Position::new(5.0, 5.0)]));
        assert_eq!(*src.0.lock().unwrap(), 4);
    }
}
