//! Cross-origin message channel.
//!
//! The parent frame posts arbitrary JSON values. Only three shapes carry
//! identity:
//! - an object with a non-empty `initData` string
//! - an object with `user_id` (plus optional `first_name` / `last_name`)
//! - a bare string mentioning `user_id` or `initData`

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

const BUS_CAPACITY: usize = 64;

/// Fan-out bus for parent-frame messages.
///
/// Messages posted while nobody listens are dropped; attach an
/// [`IdentityMessageCache`](crate::IdentityMessageCache) for the session to
/// keep identity messages that arrive between resolutions.
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<Value>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Deliver a message to every live subscription. Returns the receiver count.
    pub fn post(&self, message: Value) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> MessageSubscription {
        debug!(listeners = self.sender.receiver_count() + 1, "Message listener attached");
        MessageSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Live listener on a [`MessageBus`]. Detaches on drop.
#[derive(Debug)]
pub struct MessageSubscription {
    receiver: broadcast::Receiver<Value>,
}

impl MessageSubscription {
    pub async fn recv(&mut self) -> Result<Value, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        debug!("Message listener detached");
    }
}

/// Extract a raw identity blob from a message, if it has a known shape.
pub fn identity_payload_from_message(message: &Value) -> Option<String> {
    match message {
        Value::Object(map) => {
            if let Some(Value::String(init_data)) = map.get("initData") {
                if !init_data.trim().is_empty() {
                    return Some(init_data.clone());
                }
            }

            let user_id = map.get("user_id").and_then(scalar)?;
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("user_id", &user_id);
            query.append_pair("first_name", &map.get("first_name").and_then(scalar).unwrap_or_default());
            query.append_pair("last_name", &map.get("last_name").and_then(scalar).unwrap_or_default());
            Some(query.finish())
        }
        Value::String(text) if text.contains("user_id") || text.contains("initData") => {
            Some(text.clone())
        }
        _ => None,
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
