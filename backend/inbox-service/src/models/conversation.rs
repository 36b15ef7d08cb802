use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Normalized unordered pair of participants.
///
/// Construction sorts the two ids so `(a, b)` and `(b, a)` map to the same
/// pair, and rejects `a == b`: a conversation always has exactly two
/// distinct participants. The sorted layout is also what the storage unique
/// constraint is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantPair {
    low: Uuid,
    high: Uuid,
}

impl ParticipantPair {
    pub fn new(a: Uuid, b: Uuid) -> AppResult<Self> {
        if a == b {
            return Err(AppError::SelfReference);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The other side of the pair. Fails when `user_id` is not a participant.
    pub fn other(&self, user_id: Uuid) -> AppResult<Uuid> {
        if user_id == self.low {
            Ok(self.high)
        } else if user_id == self.high {
            Ok(self.low)
        } else {
            Err(AppError::NotParticipant)
        }
    }
}

/// Durable pairing of two users plus shared thread metadata.
///
/// The unread counters live on the conversation (one per participant) and
/// are only ever mutated through the store's atomic primitives.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: ParticipantPair,
    pub last_message_id: Option<Uuid>,
    pub last_activity_at: DateTime<Utc>,
    pub is_active: bool,
    pub unread_low: i64,
    pub unread_high: i64,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(participants: ParticipantPair, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participants,
            last_message_id: None,
            last_activity_at: now,
            is_active: true,
            unread_low: 0,
            unread_high: 0,
            created_at: now,
        }
    }

    pub fn unread_for(&self, user_id: Uuid) -> AppResult<i64> {
        if user_id == self.participants.low() {
            Ok(self.unread_low)
        } else if user_id == self.participants.high() {
            Ok(self.unread_high)
        } else {
            Err(AppError::NotParticipant)
        }
    }

    /// Public representation of the unread counters, keyed by participant id.
    pub fn unread_counts(&self) -> HashMap<Uuid, i64> {
        let mut counts = HashMap::with_capacity(2);
        counts.insert(self.participants.low(), self.unread_low);
        counts.insert(self.participants.high(), self.unread_high);
        counts
    }
}

/// Wire representation. Exposes the unread mapping keyed by user id, never
/// the sorted column layout.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDto {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub last_message_id: Option<Uuid>,
    pub last_activity_at: DateTime<Utc>,
    pub is_active: bool,
    pub unread_counts: HashMap<Uuid, i64>,
}

impl From<&Conversation> for ConversationDto {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id,
            participants: [c.participants.low(), c.participants.high()],
            last_message_id: c.last_message_id,
            last_activity_at: c.last_activity_at,
            is_active: c.is_active,
            unread_counts: c.unread_counts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let p1 = ParticipantPair::new(a, b).unwrap();
        let p2 = ParticipantPair::new(b, a).unwrap();
        assert_eq!(p1, p2);
        assert!(p1.contains(a));
        assert!(p1.contains(b));
    }

    #[test]
    fn pair_rejects_self() {
        let a = Uuid::new_v4();
        assert!(matches!(
            ParticipantPair::new(a, a),
            Err(AppError::SelfReference)
        ));
    }

    #[test]
    fn other_participant_lookup() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let pair = ParticipantPair::new(a, b).unwrap();
        assert_eq!(pair.other(a).unwrap(), b);
        assert_eq!(pair.other(b).unwrap(), a);
        assert!(matches!(
            pair.other(stranger),
            Err(AppError::NotParticipant)
        ));
    }

    #[test]
    fn unread_counts_keyed_by_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut convo =
            Conversation::new(ParticipantPair::new(a, b).unwrap(), Utc::now());
        convo.unread_low = 3;
        let counts = convo.unread_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&convo.participants.low()], 3);
        assert_eq!(counts[&convo.participants.high()], 0);
    }
}
