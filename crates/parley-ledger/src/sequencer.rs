//! The operation sequencer.
//!
//! All mutations funnel through one mpsc channel into a single task that
//! owns the write half of the state lock and the database handle.  Commands
//! are applied one at a time in arrival order, which gives every mutation a
//! position in one global total order without any finer-grained locking.
//!
//! Each command carries a oneshot reply channel; the submitting side awaits
//! it in [`Ledger::submit`](crate::Ledger).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};

use parley_shared::{Address, ConversationId, GroupId};
use parley_store::Database;

use crate::clock::Clock;
use crate::error::Result;
use crate::ids::IdSource;
use crate::state::LedgerState;

/// One sequenced mutation, paired with its reply channel.
pub(crate) enum Command {
    Register {
        caller: Address,
        address: Address,
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SetStatus {
        caller: Address,
        address: Address,
        text: String,
        duration_seconds: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    SetProfilePicture {
        caller: Address,
        address: Address,
        url: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Block {
        caller: Address,
        target: Address,
        reply: oneshot::Sender<Result<()>>,
    },
    SendMessage {
        caller: Address,
        from: Address,
        to: Address,
        content: String,
        is_media: bool,
        reply: oneshot::Sender<Result<usize>>,
    },
    MarkRead {
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    DeleteMessage {
        caller: Address,
        a: Address,
        b: Address,
        index: usize,
        deleter: Address,
        reply: oneshot::Sender<Result<()>>,
    },
    SetArchived {
        caller: Address,
        conversation: ConversationId,
        participant: Address,
        is_archived: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    CreateGroup {
        caller: Address,
        name: String,
        members: Vec<Address>,
        description: String,
        admin: Address,
        reply: oneshot::Sender<Result<GroupId>>,
    },
    ChangeAdmin {
        caller: Address,
        group: GroupId,
        new_admin: Address,
        reply: oneshot::Sender<Result<()>>,
    },
    LeaveGroup {
        caller: Address,
        group: GroupId,
        member: Address,
        reply: oneshot::Sender<Result<()>>,
    },
    SendGroupMessage {
        caller: Address,
        group: GroupId,
        sender: Address,
        content: String,
        is_media: bool,
        reply: oneshot::Sender<Result<usize>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// The single-writer task state.
pub(crate) struct Sequencer {
    pub(crate) state: Arc<RwLock<LedgerState>>,
    pub(crate) store: Option<Database>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdSource>,
    /// Count of successfully applied mutations, the "order position" of the
    /// last commit.
    pub(crate) committed: u64,
}

impl Sequencer {
    pub(crate) fn new(
        state: Arc<RwLock<LedgerState>>,
        store: Option<Database>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            state,
            store,
            clock,
            ids,
            committed: 0,
        }
    }

    /// Drain the command queue until shutdown or all submitters are gone.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            if let Command::Shutdown { reply } = command {
                rx.close();
                let _ = reply.send(());
                break;
            }
            self.dispatch(command).await;
        }
        tracing::info!(committed = self.committed, "sequencer stopped");
    }

    async fn dispatch(&mut self, command: Command) {
        macro_rules! apply {
            ($op:literal, $reply:expr, $fut:expr) => {{
                let result = $fut.await;
                if result.is_ok() {
                    self.committed += 1;
                    tracing::debug!(seq = self.committed, op = $op, "operation committed");
                } else if let Err(error) = &result {
                    tracing::debug!(op = $op, %error, "operation rejected");
                }
                let _ = $reply.send(result);
            }};
        }

        match command {
            Command::Register {
                caller,
                address,
                name,
                reply,
            } => apply!("register", reply, self.register(caller, address, name)),
            Command::SetStatus {
                caller,
                address,
                text,
                duration_seconds,
                reply,
            } => apply!(
                "set_status",
                reply,
                self.set_status(caller, address, text, duration_seconds)
            ),
            Command::SetProfilePicture {
                caller,
                address,
                url,
                reply,
            } => apply!(
                "set_profile_picture",
                reply,
                self.set_profile_picture(caller, address, url)
            ),
            Command::Block {
                caller,
                target,
                reply,
            } => apply!("block", reply, self.block(caller, target)),
            Command::SendMessage {
                caller,
                from,
                to,
                content,
                is_media,
                reply,
            } => apply!(
                "send_message",
                reply,
                self.send_message(caller, from, to, content, is_media)
            ),
            Command::MarkRead {
                caller,
                a,
                b,
                index,
                reply,
            } => apply!("mark_read", reply, self.mark_read(caller, a, b, index)),
            Command::DeleteMessage {
                caller,
                a,
                b,
                index,
                deleter,
                reply,
            } => apply!(
                "delete_message",
                reply,
                self.delete_message(caller, a, b, index, deleter)
            ),
            Command::SetArchived {
                caller,
                conversation,
                participant,
                is_archived,
                reply,
            } => apply!(
                "set_archived",
                reply,
                self.set_archived(caller, conversation, participant, is_archived)
            ),
            Command::CreateGroup {
                caller,
                name,
                members,
                description,
                admin,
                reply,
            } => apply!(
                "create_group",
                reply,
                self.create_group(caller, name, members, description, admin)
            ),
            Command::ChangeAdmin {
                caller,
                group,
                new_admin,
                reply,
            } => apply!(
                "change_admin",
                reply,
                self.change_admin(caller, group, new_admin)
            ),
            Command::LeaveGroup {
                caller,
                group,
                member,
                reply,
            } => apply!("leave_group", reply, self.leave_group(caller, group, member)),
            Command::SendGroupMessage {
                caller,
                group,
                sender,
                content,
                is_media,
                reply,
            } => apply!(
                "send_group_message",
                reply,
                self.send_group_message(caller, group, sender, content, is_media)
            ),
            Command::Shutdown { .. } => unreachable!("handled in run"),
        }
    }
}
