//! CRUD operations for the direct-chat message log.
//!
//! Rows are keyed `(chat_key, seq)` where `seq` is the stable index the
//! ledger hands back to callers.  The store trusts the sequencer to supply
//! the next free index; the primary key turns a violated assumption into a
//! constraint error instead of silent corruption.

use chrono::{DateTime, Utc};
use rusqlite::params;

use parley_shared::constants::CHAT_KEY_SIZE;
use parley_shared::{Address, ChatKey};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;

impl Database {
    /// Append a message at the given index of a direct chat.
    pub fn append_direct_message(
        &self,
        chat_key: ChatKey,
        seq: usize,
        message: &Message,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO direct_messages
                 (chat_key, seq, sender, content, created_at, is_read, is_deleted, is_media)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                chat_key.to_hex(),
                seq as i64,
                message.sender.to_hex(),
                message.content,
                message.created_at.to_rfc3339(),
                message.is_read,
                message.is_deleted,
                message.is_media,
            ],
        )?;
        Ok(())
    }

    /// Full ordered message sequence for one chat.  Empty if none sent.
    pub fn direct_messages(&self, chat_key: ChatKey) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT sender, content, created_at, is_read, is_deleted, is_media
             FROM direct_messages
             WHERE chat_key = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![chat_key.to_hex()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// All chat keys with at least one message.  Used to rebuild state.
    pub fn list_chat_keys(&self) -> Result<Vec<ChatKey>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT DISTINCT chat_key FROM direct_messages")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            let hex_str = row?;
            let bytes = hex::decode(&hex_str)?;
            let mut arr = [0u8; CHAT_KEY_SIZE];
            if bytes.len() != CHAT_KEY_SIZE {
                return Err(StoreError::CorruptChatKey(hex_str));
            }
            arr.copy_from_slice(&bytes);
            keys.push(ChatKey(arr));
        }
        Ok(keys)
    }

    /// Set the read flag on one message.  Idempotent.
    pub fn mark_direct_read(&self, chat_key: ChatKey, seq: usize) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE direct_messages SET is_read = 1 WHERE chat_key = ?1 AND seq = ?2",
            params![chat_key.to_hex(), seq as i64],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Set the soft-delete flag on one message.  Content is retained.
    pub fn mark_direct_deleted(&self, chat_key: ChatKey, seq: usize) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE direct_messages SET is_deleted = 1 WHERE chat_key = ?1 AND seq = ?2",
            params![chat_key.to_hex(), seq as i64],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].  Shared with the group log.
pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let sender_hex: String = row.get(0)?;
    let content: String = row.get(1)?;
    let created_str: String = row.get(2)?;
    let is_read: bool = row.get(3)?;
    let is_deleted: bool = row.get(4)?;
    let is_media: bool = row.get(5)?;

    let sender = Address::from_hex(&sender_hex).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        sender,
        content,
        created_at,
        is_read,
        is_deleted,
        is_media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::constants::ADDRESS_SIZE;

    fn addr(byte: u8) -> Address {
        Address([byte; ADDRESS_SIZE])
    }

    #[test]
    fn append_and_list_in_order() {
        let db = Database::open_in_memory().unwrap();
        let key = ChatKey::between(addr(1), addr(2));

        db.append_direct_message(key, 0, &Message::new(addr(1), "hi".into(), Utc::now(), false))
            .unwrap();
        db.append_direct_message(key, 1, &Message::new(addr(2), "yo".into(), Utc::now(), false))
            .unwrap();

        let messages = db.direct_messages(key).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].content, "yo");
    }

    #[test]
    fn duplicate_seq_rejected() {
        let db = Database::open_in_memory().unwrap();
        let key = ChatKey::between(addr(1), addr(2));
        let m = Message::new(addr(1), "hi".into(), Utc::now(), false);

        db.append_direct_message(key, 0, &m).unwrap();
        assert!(db.append_direct_message(key, 0, &m).is_err());
    }

    #[test]
    fn flags_update_only_target_row() {
        let db = Database::open_in_memory().unwrap();
        let key = ChatKey::between(addr(1), addr(2));

        for i in 0..3 {
            let m = Message::new(addr(1), format!("m{i}"), Utc::now(), false);
            db.append_direct_message(key, i, &m).unwrap();
        }

        db.mark_direct_read(key, 1).unwrap();
        db.mark_direct_deleted(key, 2).unwrap();

        let messages = db.direct_messages(key).unwrap();
        assert!(!messages[0].is_read && !messages[0].is_deleted);
        assert!(messages[1].is_read && !messages[1].is_deleted);
        assert!(!messages[2].is_read && messages[2].is_deleted);
        // Soft delete retains content.
        assert_eq!(messages[2].content, "m2");
    }

    #[test]
    fn list_chat_keys_distinct() {
        let db = Database::open_in_memory().unwrap();
        let k1 = ChatKey::between(addr(1), addr(2));
        let k2 = ChatKey::between(addr(3), addr(4));

        for key in [k1, k1, k2] {
            let seq = db.direct_messages(key).unwrap().len();
            let m = Message::new(addr(1), "x".into(), Utc::now(), false);
            db.append_direct_message(key, seq, &m).unwrap();
        }

        let mut keys = db.list_chat_keys().unwrap();
        keys.sort_by_key(|k| k.0);
        let mut expected = vec![k1, k2];
        expected.sort_by_key(|k| k.0);
        assert_eq!(keys, expected);
    }
}
