//! Direct-chat ledger mutations.
//!
//! Both directions of a pair resolve to the same [`ChatKey`], so there is
//! exactly one append-only log per unordered address pair.  Indices are
//! stable for the lifetime of the log.

use parley_shared::{Address, ChatKey};
use parley_store::Message;

use crate::error::{LedgerError, Result};
use crate::guard;
use crate::sequencer::Sequencer;

impl Sequencer {
    /// Append a message to the pair's ledger and return its index.
    pub(crate) async fn send_message(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        content: String,
        is_media: bool,
    ) -> Result<usize> {
        guard::ensure_self(caller, from)?;

        let mut state = self.state.write().await;
        if !state.exists(from) {
            return Err(LedgerError::UnknownParticipant(from));
        }
        if !state.exists(to) {
            return Err(LedgerError::UnknownParticipant(to));
        }

        let key = ChatKey::between(from, to);
        let message = Message::new(from, content, self.clock.now(), is_media);
        let index = state.direct_len(key);
        if let Some(db) = &self.store {
            db.append_direct_message(key, index, &message)?;
        }
        let index = state.append_direct(key, message);

        tracing::debug!(%from, %to, index, is_media, "direct message appended");
        Ok(index)
    }

    /// Flip the read flag on one message.  Idempotent.
    pub(crate) async fn mark_read(
        &mut self,
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let key = ChatKey::between(a, b);
        guard::ensure_index(index, state.direct_len(key))?;

        if let Some(db) = &self.store {
            db.mark_direct_read(key, index)?;
        }
        state.mark_direct_read(key, index);

        tracing::debug!(%caller, chat = %key, index, "message marked read");
        Ok(())
    }

    /// Soft-delete one message.  The content is retained and the log keeps
    /// its length; only the flag changes.
    pub(crate) async fn delete_message(
        &mut self,
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
        deleter: Address,
    ) -> Result<()> {
        guard::ensure_self(caller, deleter)?;

        let mut state = self.state.write().await;
        let key = ChatKey::between(a, b);
        guard::ensure_index(index, state.direct_len(key))?;

        if let Some(db) = &self.store {
            db.mark_direct_deleted(key, index)?;
        }
        state.mark_direct_deleted(key, index);

        tracing::debug!(%deleter, chat = %key, index, "message soft-deleted");
        Ok(())
    }
}
