//! The public ledger handle.
//!
//! [`Ledger`] is a cheap clone over a command channel plus the shared state
//! lock.  Mutations are submitted to the sequencer task and awaited;
//! reads take the lock's read half directly and therefore always see a
//! prefix of the committed order, never a half-applied mutation.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};

use parley_shared::{Address, ChatKey, ConversationId, GroupId};
use parley_store::{Database, Group, Message, Participant};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::ids::{IdSource, UuidIds};
use crate::sequencer::{Command, Sequencer};
use crate::state::LedgerState;

/// Handle to a running ledger.  Clone freely; all clones feed the same
/// sequencer.
#[derive(Clone)]
pub struct Ledger {
    cmd_tx: mpsc::Sender<Command>,
    state: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    /// Start a ledger with the production clock and id source.
    ///
    /// When `config.db_path` is set the database is opened (created and
    /// migrated if needed) and the in-memory state is rebuilt from it;
    /// otherwise the ledger runs purely in memory.
    pub fn start(config: LedgerConfig) -> Result<Self> {
        Self::start_with(config, Arc::new(SystemClock), Arc::new(UuidIds))
    }

    /// Start a ledger with explicit time and id collaborators.  Used by
    /// tests to pin timestamps and group ids.
    pub fn start_with(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Result<Self> {
        let (store, state) = match &config.db_path {
            Some(path) => {
                let db = Database::open_at(path)?;
                let state = LedgerState::load(&db)?;
                (Some(db), state)
            }
            None => (None, LedgerState::default()),
        };

        let state = Arc::new(RwLock::new(state));
        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_capacity);
        let sequencer = Sequencer::new(Arc::clone(&state), store, clock, ids);
        tokio::spawn(sequencer.run(cmd_rx));

        tracing::info!(persistent = config.db_path.is_some(), "ledger started");
        Ok(Self { cmd_tx, state })
    }

    /// Stop the sequencer after every already-admitted command has been
    /// applied.  Further mutations fail with [`LedgerError::Closed`].
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Shutdown { reply: tx }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn submit<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| LedgerError::Closed)?;
        rx.await.map_err(|_| LedgerError::Closed)?
    }

    // ------------------------------------------------------------------
    // Identity registry
    // ------------------------------------------------------------------

    pub async fn register(&self, caller: Address, address: Address, name: String) -> Result<()> {
        self.submit(|reply| Command::Register {
            caller,
            address,
            name,
            reply,
        })
        .await
    }

    pub async fn exists(&self, address: Address) -> bool {
        self.state.read().await.exists(address)
    }

    pub async fn profile(&self, address: Address) -> Result<Participant> {
        self.state.read().await.profile(address)
    }

    pub async fn set_status(
        &self,
        caller: Address,
        address: Address,
        text: String,
        duration_seconds: u64,
    ) -> Result<()> {
        self.submit(|reply| Command::SetStatus {
            caller,
            address,
            text,
            duration_seconds,
            reply,
        })
        .await
    }

    pub async fn set_profile_picture(
        &self,
        caller: Address,
        address: Address,
        url: String,
    ) -> Result<()> {
        self.submit(|reply| Command::SetProfilePicture {
            caller,
            address,
            url,
            reply,
        })
        .await
    }

    /// Remove `target` from the registry entirely (global revocation).
    pub async fn block(&self, caller: Address, target: Address) -> Result<()> {
        self.submit(|reply| Command::Block {
            caller,
            target,
            reply,
        })
        .await
    }

    // ------------------------------------------------------------------
    // Direct chats
    // ------------------------------------------------------------------

    /// Append a direct message and return its stable index.
    pub async fn send_message(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        content: String,
        is_media: bool,
    ) -> Result<usize> {
        self.submit(|reply| Command::SendMessage {
            caller,
            from,
            to,
            content,
            is_media,
            reply,
        })
        .await
    }

    /// Full ordered history between the two addresses, in either argument
    /// order.  Permissive: unknown participants yield an empty sequence.
    pub async fn messages(&self, a: Address, b: Address) -> Vec<Message> {
        self.state.read().await.direct_messages(ChatKey::between(a, b))
    }

    pub async fn mark_read(
        &self,
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
    ) -> Result<()> {
        self.submit(|reply| Command::MarkRead {
            caller,
            a,
            b,
            index,
            reply,
        })
        .await
    }

    pub async fn delete_message(
        &self,
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
        deleter: Address,
    ) -> Result<()> {
        self.submit(|reply| Command::DeleteMessage {
            caller,
            a,
            b,
            index,
            deleter,
            reply,
        })
        .await
    }

    /// Write an archive flag for any conversation kind.  Write-only; read
    /// the backing store for rendering.
    pub async fn set_archived(
        &self,
        caller: Address,
        conversation: ConversationId,
        participant: Address,
        is_archived: bool,
    ) -> Result<()> {
        self.submit(|reply| Command::SetArchived {
            caller,
            conversation,
            participant,
            is_archived,
            reply,
        })
        .await
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub async fn create_group(
        &self,
        caller: Address,
        name: String,
        members: Vec<Address>,
        description: String,
        admin: Address,
    ) -> Result<GroupId> {
        self.submit(|reply| Command::CreateGroup {
            caller,
            name,
            members,
            description,
            admin,
            reply,
        })
        .await
    }

    pub async fn group(&self, id: GroupId) -> Result<Group> {
        self.state.read().await.group(id).cloned()
    }

    /// Groups where the address is a member (or the admin), in stable
    /// id order.
    pub async fn groups_for(&self, address: Address) -> Vec<Group> {
        self.state.read().await.groups_for(address)
    }

    pub async fn change_admin(
        &self,
        caller: Address,
        group: GroupId,
        new_admin: Address,
    ) -> Result<()> {
        self.submit(|reply| Command::ChangeAdmin {
            caller,
            group,
            new_admin,
            reply,
        })
        .await
    }

    pub async fn leave_group(&self, caller: Address, group: GroupId, member: Address) -> Result<()> {
        self.submit(|reply| Command::LeaveGroup {
            caller,
            group,
            member,
            reply,
        })
        .await
    }

    pub async fn send_group_message(
        &self,
        caller: Address,
        group: GroupId,
        sender: Address,
        content: String,
        is_media: bool,
    ) -> Result<usize> {
        self.submit(|reply| Command::SendGroupMessage {
            caller,
            group,
            sender,
            content,
            is_media,
            reply,
        })
        .await
    }

    pub async fn group_messages(&self, id: GroupId) -> Result<Vec<Message>> {
        self.state.read().await.group_messages(id)
    }

    #[cfg(test)]
    pub(crate) async fn archived(
        &self,
        conversation: ConversationId,
        participant: Address,
    ) -> Option<bool> {
        self.state.read().await.archive_flag(conversation, participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use parley_shared::constants::ADDRESS_SIZE;

    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use crate::ids::SequentialIds;

    fn addr(byte: u8) -> Address {
        Address([byte; ADDRESS_SIZE])
    }

    fn mem_ledger() -> Ledger {
        Ledger::start(LedgerConfig::default()).unwrap()
    }

    async fn register(ledger: &Ledger, a: Address, name: &str) {
        ledger.register(a, a, name.into()).await.unwrap();
    }

    #[tokio::test]
    async fn registration_is_unique_until_blocked() {
        let ledger = mem_ledger();
        let a = addr(1);

        register(&ledger, a, "Alice").await;
        assert!(ledger.exists(a).await);

        let err = ledger.register(a, a, "Alice again".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        ledger.block(a, a).await.unwrap();
        assert!(!ledger.exists(a).await);
        let err = ledger.block(a, a).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Re-registration starts from a clean profile.
        ledger
            .set_status(a, a, "away".into(), 60)
            .await
            .unwrap_err();
        register(&ledger, a, "Alice II").await;
        let profile = ledger.profile(a).await.unwrap();
        assert_eq!(profile.name, "Alice II");
        assert_eq!(profile.status, "");
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let ledger = mem_ledger();
        let err = ledger.register(addr(1), addr(1), "  ".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!ledger.exists(addr(1)).await);
    }

    #[tokio::test]
    async fn status_expiry_uses_the_injected_clock() {
        let start = DateTime::UNIX_EPOCH + TimeDelta::days(19_000);
        let clock = Arc::new(ManualClock::new(start));
        let ledger = Ledger::start_with(
            LedgerConfig::default(),
            clock.clone(),
            Arc::new(UuidIds),
        )
        .unwrap();
        let a = addr(1);
        register(&ledger, a, "Alice").await;

        ledger.set_status(a, a, "busy".into(), 90).await.unwrap();
        let profile = ledger.profile(a).await.unwrap();
        assert_eq!(profile.status_expiry, start + TimeDelta::seconds(90));
        assert!(!profile.status_expired(clock.now()));

        clock.advance(TimeDelta::seconds(91));
        assert!(profile.status_expired(clock.now()));
    }

    #[tokio::test]
    async fn huge_status_durations_saturate() {
        let ledger = mem_ledger();
        let a = addr(1);
        register(&ledger, a, "Alice").await;

        // Durations beyond the representable range clamp to the far future
        // rather than wrapping into the past or aborting the sequencer.
        ledger.set_status(a, a, "forever".into(), u64::MAX).await.unwrap();
        let profile = ledger.profile(a).await.unwrap();
        assert!(!profile.status_expired(Utc::now()));

        ledger
            .set_status(a, a, "still here".into(), i64::MAX as u64)
            .await
            .unwrap();
        assert!(!ledger.profile(a).await.unwrap().status_expired(Utc::now()));

        // The ledger keeps serving other callers afterward.
        register(&ledger, addr(2), "Bob").await;
        assert!(ledger.exists(addr(2)).await);
    }

    #[tokio::test]
    async fn any_caller_may_set_another_status() {
        // Preserved authorization gap: status and picture updates are not
        // restricted to the profile owner.
        let ledger = mem_ledger();
        register(&ledger, addr(1), "Alice").await;
        ledger
            .set_status(addr(2), addr(1), "gone".into(), 10)
            .await
            .unwrap();
        ledger
            .set_profile_picture(addr(2), addr(1), "http://pic".into())
            .await
            .unwrap();
        let profile = ledger.profile(addr(1)).await.unwrap();
        assert_eq!(profile.status, "gone");
        assert_eq!(profile.profile_picture, "http://pic");
    }

    #[tokio::test]
    async fn both_directions_share_one_ledger() {
        let ledger = mem_ledger();
        let (a, b) = (addr(1), addr(2));
        register(&ledger, a, "Alice").await;
        register(&ledger, b, "Bob").await;

        assert_eq!(ledger.send_message(a, a, b, "hi".into(), false).await.unwrap(), 0);
        assert_eq!(ledger.send_message(b, b, a, "yo".into(), false).await.unwrap(), 1);

        let forward = ledger.messages(a, b).await;
        let backward = ledger.messages(b, a).await;
        assert_eq!(forward, backward);
        assert_eq!(forward[0].sender, a);
        assert_eq!(forward[0].content, "hi");
        assert_eq!(forward[1].sender, b);
        assert_eq!(forward[1].content, "yo");
    }

    #[tokio::test]
    async fn sending_requires_caller_to_be_sender() {
        let ledger = mem_ledger();
        register(&ledger, addr(1), "Alice").await;
        register(&ledger, addr(2), "Bob").await;

        let err = ledger
            .send_message(addr(2), addr(1), addr(2), "forged".into(), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(ledger.messages(addr(1), addr(2)).await.is_empty());
    }

    #[tokio::test]
    async fn flags_leave_other_messages_untouched() {
        let ledger = mem_ledger();
        let (a, b) = (addr(1), addr(2));
        register(&ledger, a, "Alice").await;
        register(&ledger, b, "Bob").await;

        for i in 0..3 {
            ledger
                .send_message(a, a, b, format!("m{i}"), false)
                .await
                .unwrap();
        }

        ledger.mark_read(b, a, b, 1).await.unwrap();
        // Idempotent: a second mark is a no-op, not an error.
        ledger.mark_read(b, a, b, 1).await.unwrap();
        ledger.delete_message(a, a, b, 2, a).await.unwrap();

        let log = ledger.messages(a, b).await;
        assert_eq!(log.len(), 3);
        assert!(!log[0].is_read && !log[0].is_deleted);
        assert!(log[1].is_read && !log[1].is_deleted);
        assert!(!log[2].is_read && log[2].is_deleted);
        // Soft delete retains the content.
        assert_eq!(log[2].content, "m2");

        let err = ledger.mark_read(b, a, b, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
    }

    #[tokio::test]
    async fn deleting_for_someone_else_is_unauthorized() {
        let ledger = mem_ledger();
        let (a, b) = (addr(1), addr(2));
        register(&ledger, a, "Alice").await;
        register(&ledger, b, "Bob").await;
        ledger.send_message(a, a, b, "hi".into(), false).await.unwrap();

        let err = ledger.delete_message(b, a, b, 0, a).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(!ledger.messages(a, b).await[0].is_deleted);
    }

    #[tokio::test]
    async fn blocked_recipient_rejects_new_sends_but_keeps_history() {
        let ledger = mem_ledger();
        let (a, b) = (addr(1), addr(2));
        register(&ledger, a, "Alice").await;
        register(&ledger, b, "Bob").await;
        ledger.send_message(a, a, b, "hi".into(), false).await.unwrap();

        ledger.block(b, b).await.unwrap();
        let err = ledger
            .send_message(a, a, b, "still there?".into(), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // History keys by address value, not by profile existence.
        assert_eq!(ledger.messages(a, b).await.len(), 1);

        register(&ledger, b, "Bob II").await;
        ledger.send_message(a, a, b, "welcome back".into(), false).await.unwrap();
        assert_eq!(ledger.messages(b, a).await.len(), 2);
    }

    #[tokio::test]
    async fn group_creation_is_all_or_nothing() {
        let ledger = Ledger::start_with(
            LedgerConfig::default(),
            Arc::new(SystemClock),
            Arc::new(SequentialIds::new()),
        )
        .unwrap();
        register(&ledger, addr(1), "Alice").await;

        let err = ledger
            .create_group(addr(1), "g".into(), vec![], String::new(), addr(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // addr(2) is unregistered, so nothing may be created.
        let err = ledger
            .create_group(addr(1), "g".into(), vec![addr(1), addr(2)], String::new(), addr(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(ledger.groups_for(addr(1)).await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_members_collapse_to_one() {
        // Membership is a set in either backing; the SQLite
        // (group_id, member) key must never see a repeated row.
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            db_path: Some(dir.path().join("parley.db")),
            ..LedgerConfig::default()
        };
        let ledger = Ledger::start(config).unwrap();
        register(&ledger, addr(1), "Alice").await;
        register(&ledger, addr(2), "Bob").await;

        let id = ledger
            .create_group(
                addr(1),
                "pair".into(),
                vec![addr(1), addr(2), addr(1)],
                String::new(),
                addr(1),
            )
            .await
            .unwrap();
        assert_eq!(ledger.group(id).await.unwrap().members, vec![addr(1), addr(2)]);

        // One leave removes the address entirely.
        ledger.leave_group(addr(1), id, addr(1)).await.unwrap();
        assert_eq!(ledger.group(id).await.unwrap().members, vec![addr(2)]);
    }

    #[tokio::test]
    async fn admin_transfer_is_admin_only_and_permissive() {
        let ledger = mem_ledger();
        for (i, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
            register(&ledger, addr(i), name).await;
        }
        let id = ledger
            .create_group(addr(1), "trio".into(), vec![addr(1), addr(2)], String::new(), addr(1))
            .await
            .unwrap();

        let err = ledger.change_admin(addr(2), id, addr(2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        // The new admin need not be a member.
        ledger.change_admin(addr(1), id, addr(3)).await.unwrap();
        let group = ledger.group(id).await.unwrap();
        assert_eq!(group.admin, addr(3));
        assert!(!group.is_member(addr(3)));

        // Membership still gates sending, admin or not.
        let err = ledger
            .send_group_message(addr(3), id, addr(3), "hello".into(), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn leaving_updates_the_reverse_index() {
        let ledger = mem_ledger();
        for (i, name) in [(1, "Alice"), (2, "Bob"), (3, "Carol")] {
            register(&ledger, addr(i), name).await;
        }
        let id = ledger
            .create_group(
                addr(1),
                "trio".into(),
                vec![addr(1), addr(2), addr(3)],
                "three of us".into(),
                addr(1),
            )
            .await
            .unwrap();

        ledger.leave_group(addr(2), id, addr(2)).await.unwrap();
        assert!(ledger.groups_for(addr(2)).await.is_empty());
        assert_eq!(ledger.groups_for(addr(1)).await.len(), 1);

        // Leaving twice is a no-op.
        ledger.leave_group(addr(2), id, addr(2)).await.unwrap();

        // Everyone may leave; the group survives empty, admin intact.
        ledger.leave_group(addr(1), id, addr(1)).await.unwrap();
        ledger.leave_group(addr(3), id, addr(3)).await.unwrap();
        let group = ledger.group(id).await.unwrap();
        assert!(group.members.is_empty());
        assert_eq!(group.admin, addr(1));
    }

    #[tokio::test]
    async fn group_messages_are_ordered_and_gated() {
        let ledger = mem_ledger();
        register(&ledger, addr(1), "Alice").await;
        register(&ledger, addr(2), "Bob").await;
        let id = ledger
            .create_group(addr(1), "pair".into(), vec![addr(1), addr(2)], String::new(), addr(1))
            .await
            .unwrap();

        assert_eq!(
            ledger.send_group_message(addr(1), id, addr(1), "one".into(), false).await.unwrap(),
            0
        );
        assert_eq!(
            ledger.send_group_message(addr(2), id, addr(2), "two".into(), true).await.unwrap(),
            1
        );

        let log = ledger.group_messages(id).await.unwrap();
        assert_eq!(log[0].content, "one");
        assert_eq!(log[1].content, "two");
        assert!(log[1].is_media);

        let err = ledger.group_messages(GroupId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn archive_flags_cover_both_conversation_kinds() {
        let ledger = mem_ledger();
        register(&ledger, addr(1), "Alice").await;
        register(&ledger, addr(2), "Bob").await;
        let id = ledger
            .create_group(addr(1), "pair".into(), vec![addr(1), addr(2)], String::new(), addr(1))
            .await
            .unwrap();

        let dm = ConversationId::Direct(ChatKey::between(addr(1), addr(2)));
        let group = ConversationId::Group(id);

        ledger.set_archived(addr(1), dm, addr(1), true).await.unwrap();
        ledger.set_archived(addr(1), group, addr(1), true).await.unwrap();
        ledger.set_archived(addr(1), dm, addr(1), false).await.unwrap();

        assert_eq!(ledger.archived(dm, addr(1)).await, Some(false));
        assert_eq!(ledger.archived(group, addr(1)).await, Some(true));
        assert_eq!(ledger.archived(dm, addr(2)).await, None);
    }

    #[tokio::test]
    async fn concurrent_sends_get_distinct_indices() {
        let ledger = mem_ledger();
        let (a, b) = (addr(1), addr(2));
        register(&ledger, a, "Alice").await;
        register(&ledger, b, "Bob").await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.send_message(a, a, b, format!("m{i}"), false).await
            }));
        }

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap().unwrap());
        }
        indices.sort_unstable();
        assert_eq!(indices, (0..32).collect::<Vec<_>>());
        assert_eq!(ledger.messages(a, b).await.len(), 32);
    }

    #[tokio::test]
    async fn state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            db_path: Some(dir.path().join("parley.db")),
            ..LedgerConfig::default()
        };
        let (a, b) = (addr(1), addr(2));

        let id = {
            let ledger = Ledger::start(config.clone()).unwrap();
            register(&ledger, a, "Alice").await;
            register(&ledger, b, "Bob").await;
            ledger.send_message(a, a, b, "hi".into(), false).await.unwrap();
            ledger.mark_read(b, a, b, 0).await.unwrap();
            let id = ledger
                .create_group(a, "pair".into(), vec![a, b], "us".into(), a)
                .await
                .unwrap();
            ledger.send_group_message(b, id, b, "yo".into(), false).await.unwrap();
            ledger.shutdown().await;
            id
        };

        let ledger = Ledger::start(config).unwrap();
        assert_eq!(ledger.profile(a).await.unwrap().name, "Alice");

        let log = ledger.messages(b, a).await;
        assert_eq!(log.len(), 1);
        assert!(log[0].is_read);

        let group = ledger.group(id).await.unwrap();
        assert_eq!(group.members, vec![a, b]);
        assert_eq!(ledger.group_messages(id).await.unwrap().len(), 1);
        assert_eq!(ledger.groups_for(b).await.len(), 1);

        // Appending after reload continues the index sequence.
        assert_eq!(ledger.send_message(a, a, b, "again".into(), false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mutations_fail_after_shutdown() {
        let ledger = mem_ledger();
        ledger.shutdown().await;
        let err = ledger.register(addr(1), addr(1), "late".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
