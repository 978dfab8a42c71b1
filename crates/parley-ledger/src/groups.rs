//! Group directory and group-chat ledger mutations.

use std::collections::HashSet;

use parley_shared::{Address, GroupId};
use parley_store::{Group, Message};

use crate::error::{LedgerError, Result};
use crate::guard;
use crate::sequencer::Sequencer;

impl Sequencer {
    /// Create a group with a fresh id and index every member (and a
    /// non-member admin) in the reverse index.  All-or-nothing: a single
    /// unregistered member creates no group and no index entries.
    pub(crate) async fn create_group(
        &mut self,
        caller: Address,
        name: String,
        mut members: Vec<Address>,
        description: String,
        admin: Address,
    ) -> Result<GroupId> {
        if members.is_empty() {
            return Err(LedgerError::EmptyMembers);
        }
        // Membership is a set; collapse repeats, keeping first-seen order,
        // so the store's (group_id, member) key never sees a duplicate.
        let mut seen = HashSet::new();
        members.retain(|m| seen.insert(*m));

        let mut state = self.state.write().await;
        for member in &members {
            guard::ensure_registered(&state, *member)?;
        }

        let group = Group {
            id: self.ids.next_group_id(),
            name,
            description,
            members,
            admin,
        };
        if let Some(db) = &mut self.store {
            db.insert_group(&group)?;
        }
        let id = group.id;
        state.insert_group(group);

        tracing::debug!(%caller, group = %id, "group created");
        Ok(id)
    }

    /// Hand the admin seat to `new_admin`.  Admin-only; the new admin is
    /// deliberately not required to be a member.
    pub(crate) async fn change_admin(
        &mut self,
        caller: Address,
        id: GroupId,
        new_admin: Address,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        guard::ensure_admin(state.group(id)?, caller)?;

        if let Some(db) = &self.store {
            db.update_group_admin(id, new_admin)?;
        }
        state.set_admin(id, new_admin);

        tracing::debug!(group = %id, %new_admin, "group admin changed");
        Ok(())
    }

    /// Remove a member from the group.  Leaving when not a member is a
    /// no-op.  A departing admin keeps the admin seat; the last member
    /// leaving leaves an empty group behind, never a deleted one.
    pub(crate) async fn leave_group(
        &mut self,
        caller: Address,
        id: GroupId,
        member: Address,
    ) -> Result<()> {
        guard::ensure_self(caller, member)?;

        let mut state = self.state.write().await;
        state.group(id)?;

        if let Some(db) = &self.store {
            db.remove_group_member(id, member)?;
        }
        state.remove_member(id, member);

        tracing::debug!(group = %id, %member, "member left group");
        Ok(())
    }

    /// Append a message to the group log and return its index.
    /// Membership-gated: a non-member sender is rejected even if they are
    /// the admin.
    pub(crate) async fn send_group_message(
        &mut self,
        caller: Address,
        id: GroupId,
        sender: Address,
        content: String,
        is_media: bool,
    ) -> Result<usize> {
        guard::ensure_self(caller, sender)?;

        let mut state = self.state.write().await;
        guard::ensure_member(state.group(id)?, sender)?;

        let message = Message::new(sender, content, self.clock.now(), is_media);
        let index = state.group_len(id);
        if let Some(db) = &self.store {
            db.append_group_message(id, index, &message)?;
        }
        let index = state.append_group(id, message);

        tracing::debug!(group = %id, %sender, index, "group message appended");
        Ok(index)
    }
}
