//! Archive preference flags.
//!
//! The ledger core only ever writes these; reading them back is left to
//! whatever layer renders conversation lists.  [`Database::archive_flag`] is
//! that external read path (and what the tests use).

use rusqlite::params;

use parley_shared::{Address, ConversationId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Upsert the archive flag for one (conversation, participant) pair.
    /// Idempotent.
    pub fn set_archive_flag(
        &self,
        conversation: ConversationId,
        participant: Address,
        is_archived: bool,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO archive_flags (conversation, participant, is_archived)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (conversation, participant)
             DO UPDATE SET is_archived = excluded.is_archived",
            params![
                conversation.storage_key(),
                participant.to_hex(),
                is_archived,
            ],
        )?;
        Ok(())
    }

    /// Read one archive flag.  `None` means the pair was never written.
    pub fn archive_flag(
        &self,
        conversation: ConversationId,
        participant: Address,
    ) -> Result<Option<bool>> {
        let mut stmt = self.conn().prepare(
            "SELECT is_archived FROM archive_flags
             WHERE conversation = ?1 AND participant = ?2",
        )?;

        let mut rows = stmt.query_map(
            params![conversation.storage_key(), participant.to_hex()],
            |row| row.get::<_, bool>(0),
        )?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}
