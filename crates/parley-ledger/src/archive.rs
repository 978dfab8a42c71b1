//! Archive preference writes.
//!
//! The flag is write-only here: nothing in the core reads it back, so there
//! is no read accessor on [`Ledger`](crate::Ledger).  A rendering layer is
//! expected to consult the backing store directly.

use parley_shared::{Address, ConversationId};

use crate::error::Result;
use crate::sequencer::Sequencer;

impl Sequencer {
    /// Upsert one (conversation, participant) archive flag.  Idempotent,
    /// and deliberately unrestricted in who may write it.
    pub(crate) async fn set_archived(
        &mut self,
        caller: Address,
        conversation: ConversationId,
        participant: Address,
        is_archived: bool,
    ) -> Result<()> {
        let mut state = self.state.write().await;

        if let Some(db) = &self.store {
            db.set_archive_flag(conversation, participant, is_archived)?;
        }
        state.set_archived(conversation, participant, is_archived);

        tracing::debug!(%caller, %conversation, %participant, is_archived, "archive flag set");
        Ok(())
    }
}
