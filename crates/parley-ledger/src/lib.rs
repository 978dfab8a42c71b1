//! Durable ledger and identity directory for a peer-to-peer messenger.
//!
//! The crate exposes one entry point, [`Ledger`]: a cloneable handle whose
//! mutations are serialized through a single sequencer task and whose reads
//! observe a consistent snapshot of the committed order.  It covers the
//! participant registry, direct and group chat ledgers, the group
//! directory with its reverse index, and archive preference writes, with
//! optional SQLite write-through via `parley-store`.

mod archive;
mod chats;
mod clock;
mod config;
mod error;
mod groups;
mod guard;
mod ids;
mod ledger;
mod registry;
mod sequencer;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use ids::{IdSource, SequentialIds, UuidIds};
pub use ledger::Ledger;

pub use parley_shared::{Address, ChatKey, ConversationId, GroupId};
pub use parley_store::{Group, Message, Participant};
