//! Identity registry mutations.

use chrono::{DateTime, TimeDelta, Utc};

use parley_shared::Address;
use parley_store::Participant;

use crate::error::{LedgerError, Result};
use crate::sequencer::Sequencer;

impl Sequencer {
    /// Register a fresh profile.  The address must be absent.
    pub(crate) async fn register(
        &mut self,
        caller: Address,
        address: Address,
        name: String,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(LedgerError::EmptyName);
        }

        let mut state = self.state.write().await;
        if state.exists(address) {
            return Err(LedgerError::AlreadyRegistered(address));
        }

        let participant = Participant::new(address, name);
        if let Some(db) = &self.store {
            db.insert_participant(&participant)?;
        }
        state.insert_participant(participant);

        tracing::debug!(%caller, %address, "participant registered");
        Ok(())
    }

    /// Set the status text with an expiry of `now + duration_seconds`.
    ///
    /// Any caller may update any registered address; tightening this to
    /// self-only is a deliberate non-change (see DESIGN.md).
    pub(crate) async fn set_status(
        &mut self,
        caller: Address,
        address: Address,
        text: String,
        duration_seconds: u64,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.exists(address) {
            return Err(LedgerError::UnknownParticipant(address));
        }

        // Durations beyond the representable range saturate to the far
        // future instead of overflowing (a status that never expires).
        let expiry = i64::try_from(duration_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|d| self.clock.now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Some(db) = &self.store {
            db.update_participant_status(address, &text, expiry)?;
        }
        state.set_status(address, text, expiry);

        tracing::debug!(%caller, %address, %expiry, "status updated");
        Ok(())
    }

    pub(crate) async fn set_profile_picture(
        &mut self,
        caller: Address,
        address: Address,
        url: String,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.exists(address) {
            return Err(LedgerError::UnknownParticipant(address));
        }

        if let Some(db) = &self.store {
            db.update_participant_picture(address, &url)?;
        }
        state.set_profile_picture(address, url);

        tracing::debug!(%caller, %address, "profile picture updated");
        Ok(())
    }

    /// Remove the target's profile for every observer.
    ///
    /// This is global identity revocation, not a private block list.  The
    /// address may register again afterward with a clean profile; message
    /// history and group membership key by the address value and survive.
    pub(crate) async fn block(&mut self, caller: Address, target: Address) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.exists(target) {
            return Err(LedgerError::UnknownParticipant(target));
        }

        if let Some(db) = &self.store {
            db.delete_participant(target)?;
        }
        state.remove_participant(target);

        tracing::debug!(%caller, %target, "participant blocked");
        Ok(())
    }
}
