//! Delivery gateway events.
//!
//! Every real-time push crosses this boundary as a [`GatewayEvent`]. Events
//! serialize to a flat JSON structure:
//!
//! ```json
//! {
//!     "type": "message.new",
//!     "timestamp": "2026-08-07T10:30:00Z",
//!     "user_id": "uuid",
//!     "message": { ... }
//! }
//! ```
//!
//! Payloads carry only the entity's public representation, the same DTOs
//! the REST surface returns.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{MessageDto, NotificationDto};

#[derive(Debug, Clone, Serialize)]
pub enum GatewayEvent {
    /// New message persisted; pushed to the receiver.
    #[serde(rename = "message.new")]
    MessageNew { message: MessageDto },

    /// Message soft-deleted by its sender; pushed to the other participant.
    #[serde(rename = "message.deleted")]
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// Notification stored; pushed to its recipient.
    #[serde(rename = "notification.created")]
    NotificationCreated { notification: NotificationDto },
}

impl GatewayEvent {
    /// Event type as string (e.g., "message.new")
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message.new",
            Self::MessageDeleted { .. } => "message.deleted",
            Self::NotificationCreated { .. } => "notification.created",
        }
    }

    /// Serializes the flat payload pushed over the target's live session.
    /// This is the only place event serialization happens.
    pub fn to_payload(&self, target_user_id: Uuid) -> Result<String, serde_json::Error> {
        let mut payload = serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
            "user_id": target_user_id,
        });

        // Flatten the variant fields into the envelope.
        if let serde_json::Value::Object(map) = serde_json::to_value(self)? {
            for (_, fields) in map {
                if let serde_json::Value::Object(fields) = fields {
                    for (key, value) in fields {
                        payload[key] = value;
                    }
                }
            }
        }

        serde_json::to_string(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, MessageBody};

    #[test]
    fn event_type_naming() {
        let event = GatewayEvent::MessageDeleted {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
        };
        assert_eq!(event.event_type(), "message.deleted");
    }

    #[test]
    fn payload_is_flat_and_carries_envelope_fields() {
        let target = Uuid::new_v4();
        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();

        let event = GatewayEvent::MessageDeleted {
            conversation_id,
            message_id,
        };
        let payload = event.to_payload(target).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed["type"], "message.deleted");
        assert_eq!(parsed["user_id"], target.to_string());
        assert_eq!(parsed["conversation_id"], conversation_id.to_string());
        assert_eq!(parsed["message_id"], message_id.to_string());
        assert!(parsed["timestamp"].is_string());
        // No nested "data" wrapper.
        assert!(parsed.get("data").is_none());
    }

    #[test]
    fn message_payload_uses_public_representation() {
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let message = Message::new(
            Uuid::new_v4(),
            sender,
            receiver,
            MessageBody::text("hello").unwrap(),
            Utc::now(),
        );
        let event = GatewayEvent::MessageNew {
            message: MessageDto::from(&message),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_payload(receiver).unwrap()).unwrap();

        assert_eq!(parsed["type"], "message.new");
        assert_eq!(parsed["message"]["id"], message.id.to_string());
        assert_eq!(parsed["message"]["content"], "hello");
        assert_eq!(parsed["message"]["message_type"], "text");
    }
}
