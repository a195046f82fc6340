use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::{state::LinkStatus, LinkConfig, LinkError, Transport};

const MAX_REPLY: usize = 1518;

/// Tello SDK text protocol over UDP: one datagram out, one datagram back.
pub struct UdpTransport {
    cfg: LinkConfig,
    sock: Option<UdpSocket>,
    status: Arc<Mutex<LinkStatus>>,
}

impl UdpTransport {
    pub fn new(cfg: LinkConfig) -> Self {
        Self { cfg, sock: None, status: Arc::new(Mutex::new(LinkStatus::default())) }
    }

    pub fn status(&self) -> LinkStatus {
        self.status_mut().clone()
    }

    fn status_mut(&self) -> MutexGuard<'_, LinkStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    // A reply that arrives after its command timed out would otherwise be
    // taken as the answer to the next command.
    fn drain_stale(sock: &UdpSocket) {
        let mut buf = [0u8; MAX_REPLY];
        while let Ok(n) = sock.try_recv(&mut buf) {
            debug!("link: dropping stale reply {:?}", String::from_utf8_lossy(&buf[..n]));
        }
    }
}

impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<(), LinkError> {
        let peer: SocketAddr = self
            .cfg
            .drone_addr
            .parse()
            .map_err(|_| LinkError::BadAddress(self.cfg.drone_addr.clone()))?;
        let sock = UdpSocket::bind(&self.cfg.local_addr).await?;
        sock.connect(peer).await?;
        info!("link: connected {} -> {}", sock.local_addr()?, peer);

        {
            let mut st = self.status_mut();
            st.connected = true;
            st.peer = Some(peer.to_string());
        }
        self.sock = Some(sock);
        Ok(())
    }

    async fn send_command(&mut self, text: &str) -> Result<String, LinkError> {
        let sock = self.sock.as_ref().ok_or(LinkError::NotConnected)?;
        Self::drain_stale(sock);
        sock.send(text.as_bytes()).await?;

        let mut buf = [0u8; MAX_REPLY];
        let n = match self.cfg.response_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), sock.recv(&mut buf))
                .await
                .map_err(|_| LinkError::Timeout { command: text.to_string(), after_ms: ms })??,
            None => sock.recv(&mut buf).await?,
        };
        let reply = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        debug!("link: {:?} -> {:?}", text, reply);

        let mut st = self.status_mut();
        st.commands_sent += 1;
        st.last_command = Some(text.to_string());
        st.last_reply = Some(reply.clone());
        st.last_reply_at = Some(Instant::now());
        Ok(reply)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        if self.sock.take().is_some() {
            info!("link: closed");
        }
        self.status_mut().connected = false;
        Ok(())
    }
}
