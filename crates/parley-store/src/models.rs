//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a network-facing layer as a typed result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_shared::{Address, GroupId};

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A registered participant profile.  Existence in the registry *is* the
/// existence of the identity; there is no "active" flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// The participant's account address.
    pub address: Address,
    /// Display name, non-empty.
    pub name: String,
    /// Free-form status text, empty until set.
    pub status: String,
    /// Absolute expiry of the current status.  Unix epoch when unset.
    pub status_expiry: DateTime<Utc>,
    /// Profile picture URL, empty until set.
    pub profile_picture: String,
}

impl Participant {
    /// A freshly registered profile: empty status, epoch expiry, no picture.
    pub fn new(address: Address, name: String) -> Self {
        Self {
            address,
            name,
            status: String::new(),
            status_expiry: DateTime::UNIX_EPOCH,
            profile_picture: String::new(),
        }
    }

    /// Whether the current status has expired at `now`.
    pub fn status_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.status_expiry
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message (direct or group).
///
/// Immutable once appended except for the two flags: `is_read` only ever
/// flips false to true, `is_deleted` hides the message without erasing the
/// content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Address of the sender.
    pub sender: Address,
    /// Message body (or media URL when `is_media` is set).
    pub content: String,
    /// Set at append time, never mutated.
    pub created_at: DateTime<Utc>,
    /// Read receipt flag.
    pub is_read: bool,
    /// Soft-delete flag.  Content is retained.
    pub is_deleted: bool,
    /// Whether `content` refers to a media attachment.
    pub is_media: bool,
}

impl Message {
    /// A freshly sent message with both flags cleared.
    pub fn new(sender: Address, content: String, created_at: DateTime<Utc>, is_media: bool) -> Self {
        Self {
            sender,
            content,
            created_at,
            is_read: false,
            is_deleted: false,
            is_media,
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Group metadata.  The message log is kept separately, keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    /// Generated unique identifier, independent of the name.
    pub id: GroupId,
    /// Display name (not unique).
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Member addresses in insertion order.  Non-empty at creation; may
    /// become empty if everyone leaves.
    pub members: Vec<Address>,
    /// Single admin.  Not required to be a member.
    pub admin: Address,
}

impl Group {
    pub fn is_member(&self, address: Address) -> bool {
        self.members.contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use parley_shared::constants::ADDRESS_SIZE;

    fn addr(byte: u8) -> Address {
        Address([byte; ADDRESS_SIZE])
    }

    #[test]
    fn fresh_participant_has_clean_profile() {
        let p = Participant::new(addr(1), "Willy".into());
        assert_eq!(p.status, "");
        assert_eq!(p.profile_picture, "");
        assert_eq!(p.status_expiry, DateTime::UNIX_EPOCH);
        assert!(p.status_expired(Utc::now()));
    }

    #[test]
    fn status_expiry_is_absolute() {
        let mut p = Participant::new(addr(1), "Willy".into());
        let now = Utc::now();
        p.status_expiry = now + TimeDelta::seconds(60);
        assert!(!p.status_expired(now));
        assert!(p.status_expired(now + TimeDelta::seconds(61)));
    }

    #[test]
    fn participant_serde_round_trip() {
        let p = Participant::new(addr(7), "Alice".into());
        let json = serde_json::to_string(&p).unwrap();
        let back: Participant = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn fresh_message_flags_cleared() {
        let m = Message::new(addr(1), "hi".into(), Utc::now(), false);
        assert!(!m.is_read);
        assert!(!m.is_deleted);
    }
}
