//! The in-memory state machine.
//!
//! [`LedgerState`] holds the registry, both message ledgers, the group
//! directory with its reverse index, and the archive flags, behind one
//! `RwLock` owned by the [`Ledger`](crate::Ledger) handle.  Only the
//! sequencer task takes the write half; reads observe a prefix of the
//! committed operation order.
//!
//! The apply methods here assume the sequencer has already validated the
//! operation; they are infallible and never partially apply.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use parley_shared::{Address, ChatKey, ConversationId, GroupId};
use parley_store::{Database, Group, Message, Participant, StoreError};

use crate::error::{LedgerError, Result};

#[derive(Default)]
pub(crate) struct LedgerState {
    /// Registered profiles.  Presence is existence.
    participants: HashMap<Address, Participant>,
    /// Direct chats, keyed by canonical chat key.
    direct_chats: HashMap<ChatKey, Vec<Message>>,
    /// Group metadata.
    groups: HashMap<GroupId, Group>,
    /// Group message logs, kept out of [`Group`] so directory reads stay
    /// cheap.
    group_logs: HashMap<GroupId, Vec<Message>>,
    /// Reverse index: address -> groups it belongs to (or administers).
    memberships: HashMap<Address, HashSet<GroupId>>,
    /// Archive preferences.  Write-only for the ledger API.
    archive_flags: HashMap<(ConversationId, Address), bool>,
}

impl LedgerState {
    /// Rebuild the state from a persisted database.
    ///
    /// Archive flags stay in the database only; they have no read path in
    /// the core, so there is nothing to warm up.
    pub(crate) fn load(db: &Database) -> std::result::Result<Self, StoreError> {
        let mut state = Self::default();

        for participant in db.list_participants()? {
            state.participants.insert(participant.address, participant);
        }

        for chat_key in db.list_chat_keys()? {
            state
                .direct_chats
                .insert(chat_key, db.direct_messages(chat_key)?);
        }

        for group in db.list_groups()? {
            state.group_logs.insert(group.id, db.group_messages(group.id)?);
            state.index_group(&group);
            state.groups.insert(group.id, group);
        }

        tracing::info!(
            participants = state.participants.len(),
            chats = state.direct_chats.len(),
            groups = state.groups.len(),
            "ledger state loaded"
        );

        Ok(state)
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    pub(crate) fn exists(&self, address: Address) -> bool {
        self.participants.contains_key(&address)
    }

    pub(crate) fn profile(&self, address: Address) -> Result<Participant> {
        self.participants
            .get(&address)
            .cloned()
            .ok_or(LedgerError::UnknownParticipant(address))
    }

    pub(crate) fn insert_participant(&mut self, participant: Participant) {
        self.participants.insert(participant.address, participant);
    }

    pub(crate) fn set_status(&mut self, address: Address, status: String, expiry: DateTime<Utc>) {
        if let Some(p) = self.participants.get_mut(&address) {
            p.status = status;
            p.status_expiry = expiry;
        }
    }

    pub(crate) fn set_profile_picture(&mut self, address: Address, url: String) {
        if let Some(p) = self.participants.get_mut(&address) {
            p.profile_picture = url;
        }
    }

    /// Remove a profile.  Message ledgers and group membership key by the
    /// address value and deliberately survive this.
    pub(crate) fn remove_participant(&mut self, address: Address) {
        self.participants.remove(&address);
    }

    // ------------------------------------------------------------------
    // Direct chats
    // ------------------------------------------------------------------

    pub(crate) fn direct_messages(&self, key: ChatKey) -> Vec<Message> {
        self.direct_chats.get(&key).cloned().unwrap_or_default()
    }

    pub(crate) fn direct_len(&self, key: ChatKey) -> usize {
        self.direct_chats.get(&key).map_or(0, Vec::len)
    }

    /// Append and return the new stable index.
    pub(crate) fn append_direct(&mut self, key: ChatKey, message: Message) -> usize {
        let log = self.direct_chats.entry(key).or_default();
        log.push(message);
        log.len() - 1
    }

    pub(crate) fn mark_direct_read(&mut self, key: ChatKey, index: usize) {
        if let Some(m) = self.direct_chats.get_mut(&key).and_then(|log| log.get_mut(index)) {
            m.is_read = true;
        }
    }

    pub(crate) fn mark_direct_deleted(&mut self, key: ChatKey, index: usize) {
        if let Some(m) = self.direct_chats.get_mut(&key).and_then(|log| log.get_mut(index)) {
            m.is_deleted = true;
        }
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub(crate) fn group(&self, id: GroupId) -> Result<&Group> {
        self.groups.get(&id).ok_or(LedgerError::UnknownGroup(id))
    }

    /// Groups the address belongs to (or administers), in stable id order.
    pub(crate) fn groups_for(&self, address: Address) -> Vec<Group> {
        let mut groups: Vec<Group> = self
            .memberships
            .get(&address)
            .into_iter()
            .flatten()
            .filter_map(|id| self.groups.get(id))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id.0);
        groups
    }

    pub(crate) fn group_messages(&self, id: GroupId) -> Result<Vec<Message>> {
        if !self.groups.contains_key(&id) {
            return Err(LedgerError::UnknownGroup(id));
        }
        Ok(self.group_logs.get(&id).cloned().unwrap_or_default())
    }

    pub(crate) fn group_len(&self, id: GroupId) -> usize {
        self.group_logs.get(&id).map_or(0, Vec::len)
    }

    /// Insert a group with its (empty) log and all reverse-index entries.
    pub(crate) fn insert_group(&mut self, group: Group) {
        self.index_group(&group);
        self.group_logs.entry(group.id).or_default();
        self.groups.insert(group.id, group);
    }

    pub(crate) fn set_admin(&mut self, id: GroupId, new_admin: Address) {
        let Some(group) = self.groups.get_mut(&id) else {
            return;
        };
        let old_admin = group.admin;
        group.admin = new_admin;
        let old_still_member = group.is_member(old_admin);
        self.memberships.entry(new_admin).or_default().insert(id);
        // The old admin stays discoverable only through membership.
        if old_admin != new_admin && !old_still_member {
            self.unindex(old_admin, id);
        }
    }

    pub(crate) fn remove_member(&mut self, id: GroupId, member: Address) {
        let Some(group) = self.groups.get_mut(&id) else {
            return;
        };
        group.members.retain(|m| *m != member);
        let was_admin = group.admin == member;
        // A departing admin keeps the seat, and with it discoverability.
        if !was_admin {
            self.unindex(member, id);
        }
    }

    pub(crate) fn append_group(&mut self, id: GroupId, message: Message) -> usize {
        let log = self.group_logs.entry(id).or_default();
        log.push(message);
        log.len() - 1
    }

    // ------------------------------------------------------------------
    // Archive flags
    // ------------------------------------------------------------------

    pub(crate) fn set_archived(
        &mut self,
        conversation: ConversationId,
        participant: Address,
        is_archived: bool,
    ) {
        self.archive_flags
            .insert((conversation, participant), is_archived);
    }

    /// Backing-store read used by tests; the ledger API itself never
    /// consults archive flags.
    #[cfg(test)]
    pub(crate) fn archive_flag(
        &self,
        conversation: ConversationId,
        participant: Address,
    ) -> Option<bool> {
        self.archive_flags.get(&(conversation, participant)).copied()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Add reverse-index entries for every member, and for a non-member
    /// admin (discoverability).
    fn index_group(&mut self, group: &Group) {
        for member in &group.members {
            self.memberships.entry(*member).or_default().insert(group.id);
        }
        self.memberships
            .entry(group.admin)
            .or_default()
            .insert(group.id);
    }

    fn unindex(&mut self, address: Address, id: GroupId) {
        if let Some(set) = self.memberships.get_mut(&address) {
            set.remove(&id);
            if set.is_empty() {
                self.memberships.remove(&address);
            }
        }
    }
}
