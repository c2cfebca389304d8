//! Connection Task
//!
//! Owns one WebSocket connection attempt: opens it, forwards text frames to
//! the controller, sends the keepalive token on a fixed interval and reports
//! the close. The task never touches dashboard state itself.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::client::LiveEvent;
use super::messages::KEEPALIVE_TOKEN;

/// Run a single connection attempt to completion
///
/// Emits `Opened` once the handshake succeeds, one `Frame` per text frame,
/// and exactly one `Closed` unless the attempt was cancelled.
pub(crate) async fn run_connection(
    url: String,
    attempt: u64,
    keepalive: Duration,
    events: mpsc::UnboundedSender<LiveEvent>,
    cancel: CancellationToken,
) {
    tracing::debug!(attempt, url = %url, "Opening live connection");

    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let _ = events.send(LiveEvent::Closed {
                attempt,
                reason: format!("connect failed: {}", e),
            });
            return;
        }
    };

    if events.send(LiveEvent::Opened { attempt }).is_err() {
        return;
    }

    let (mut sender, mut receiver) = stream.split();

    let mut ticker = tokio::time::interval_at(Instant::now() + keepalive, keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sender.close().await;
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = sender.send(Message::Text(KEEPALIVE_TOKEN.to_string())).await {
                    break format!("keepalive failed: {}", e);
                }
                tracing::trace!(attempt, "Sent keepalive");
            }
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if events.send(LiveEvent::Frame { attempt, text }).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| format!("closed by server: {} {}", f.code, f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!(attempt, "Ignoring binary frame");
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("receive error: {}", e),
                None => break "stream ended".to_string(),
            }
        }
    };

    let _ = events.send(LiveEvent::Closed { attempt, reason });
}
