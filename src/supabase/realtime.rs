//! Realtime change feed
//!
//! Speaks the Phoenix channel protocol used by the realtime service: join a
//! topic with a `postgres_changes` filter, heartbeat on the `phoenix` topic,
//! and receive one `postgres_changes` message per row change.

use futures_util::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;

use super::error::{SupabaseError, SupabaseResult};
use super::SupabaseClient;

/// Channel the dashboard subscribes to
pub const CHANNEL_NAME: &str = "classifications-changes";

/// Interval between Phoenix heartbeats
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Phoenix channel envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

impl PhoenixMessage {
    fn new(topic: &str, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    fn to_frame(&self) -> SupabaseResult<Message> {
        Ok(Message::Text(serde_json::to_string(self)?))
    }
}

/// Active change feed subscription
///
/// Dropping the handle stops delivery without a clean leave.
pub struct RealtimeSubscription {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RealtimeSubscription {
    /// Leave the channel and close the socket
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn channel_topic() -> String {
    format!("realtime:{}", CHANNEL_NAME)
}

impl SupabaseClient {
    fn realtime_url(&self) -> SupabaseResult<String> {
        let base = self.config.url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return Err(SupabaseError::Url(base.to_string()));
        };

        Ok(format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base,
            urlencoding::encode(&self.config.anon_key)
        ))
    }

    fn join_payload(&self) -> Value {
        json!({
            "config": {
                "broadcast": {"self": false},
                "presence": {"key": ""},
                "postgres_changes": [
                    {"event": "*", "schema": "public", "table": self.config.table}
                ]
            },
            "access_token": self.bearer()
        })
    }

    /// Deliver every insert, update and delete on the classifications table
    ///
    /// `handler` receives each change payload as-is. Returns once the server
    /// has accepted the join; a rejected or unanswered join is an error.
    pub async fn subscribe_to_classifications<F>(&self, handler: F) -> SupabaseResult<RealtimeSubscription>
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.open_channel(HEARTBEAT_INTERVAL, handler).await
    }

    pub(crate) async fn open_channel<F>(&self, heartbeat: Duration, mut handler: F) -> SupabaseResult<RealtimeSubscription>
    where
        F: FnMut(Value) + Send + 'static,
    {
        let url = self.realtime_url()?;
        let (stream, _response) = connect_async(url.as_str()).await?;
        let (mut sender, mut receiver) = stream.split();

        let topic = channel_topic();
        let mut next_ref: u64 = 1;
        sender
            .send(PhoenixMessage::new(&topic, "phx_join", self.join_payload(), next_ref).to_frame()?)
            .await?;

        let join_ref = next_ref.to_string();
        let joined = await_join_reply(&mut receiver, &topic, &join_ref, &mut handler);
        match tokio::time::timeout(self.config.request_timeout, joined).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = sender.close().await;
                return Err(e);
            }
            Err(_) => {
                let _ = sender.close().await;
                return Err(SupabaseError::Realtime("no reply to channel join".to_string()));
            }
        }
        tracing::info!(topic = %topic, "Joined realtime channel");

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + heartbeat, heartbeat);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        next_ref += 1;
                        if let Ok(frame) = PhoenixMessage::new(&topic, "phx_leave", json!({}), next_ref).to_frame() {
                            let _ = sender.send(frame).await;
                        }
                        let _ = sender.close().await;
                        tracing::info!(topic = %topic, "Left realtime channel");
                        break;
                    }
                    _ = ticker.tick() => {
                        next_ref += 1;
                        let sent = match PhoenixMessage::new("phoenix", "heartbeat", json!({}), next_ref).to_frame() {
                            Ok(frame) => sender.send(frame).await.map_err(SupabaseError::from),
                            Err(e) => Err(e),
                        };
                        if let Err(e) = sent {
                            tracing::warn!(error = %e, "Realtime heartbeat failed");
                            break;
                        }
                    }
                    frame = receiver.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if !dispatch(&topic, &text, &mut handler) {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::warn!(topic = %topic, "Realtime socket closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Realtime receive error");
                            break;
                        }
                    }
                }
            }
        });

        Ok(RealtimeSubscription {
            cancel,
            task: Some(task),
        })
    }
}

/// Read frames until the server answers the join carrying `join_ref`
///
/// Changes that arrive ahead of the reply are still delivered.
async fn await_join_reply<S, F>(
    receiver: &mut S,
    topic: &str,
    join_ref: &str,
    handler: &mut F,
) -> SupabaseResult<()>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    F: FnMut(Value),
{
    while let Some(frame) = receiver.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply = match serde_json::from_str::<PhoenixMessage>(&text) {
            Ok(message)
                if message.event == "phx_reply" && message.reference.as_deref() == Some(join_ref) =>
            {
                message
            }
            _ => {
                if !dispatch(topic, &text, handler) {
                    break;
                }
                continue;
            }
        };

        return match reply.payload.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            _ => Err(SupabaseError::Realtime(format!(
                "channel join rejected: {}",
                rejection_reason(&reply.payload)
            ))),
        };
    }

    Err(SupabaseError::Realtime("socket closed before channel join".to_string()))
}

fn rejection_reason(payload: &Value) -> String {
    let response = &payload["response"];
    match response.get("reason").and_then(Value::as_str) {
        Some(reason) => reason.to_string(),
        None => response.to_string(),
    }
}

/// Route one inbound frame; returns false when the channel is gone
fn dispatch<F: FnMut(Value)>(topic: &str, text: &str, handler: &mut F) -> bool {
    let message: PhoenixMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed realtime frame");
            return true;
        }
    };

    if message.topic != topic {
        return true;
    }

    match message.event.as_str() {
        "postgres_changes" => {
            let change = match message.payload {
                Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
                other => other,
            };
            handler(change);
            true
        }
        "phx_reply" => {
            if message.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(payload = %message.payload, "Realtime request rejected");
            }
            true
        }
        "phx_error" | "phx_close" => {
            tracing::warn!(event = %message.event, "Realtime channel closed by server");
            false
        }
        _ => true,
    }
}
