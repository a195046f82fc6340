use hop_link::{LinkError, Transport};
use std::time::Duration;
use tracing::info;

/// Sends one command, then holds off for `delay`. The link drops commands
/// that arrive back-to-back.
pub(crate) async fn send_paced<T: Transport>(
    transport: &mut T,
    text: &str,
    delay: Duration,
) -> Result<String, LinkError> {
    info!("link: sending {}", text);
    let reply = transport.send_command(text).await?;
    tokio::time::sleep(delay).await;
    Ok(reply)
}
