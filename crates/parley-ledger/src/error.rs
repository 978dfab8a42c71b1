use thiserror::Error;

use parley_shared::{Address, GroupId};
use parley_store::StoreError;

/// Coarse error taxonomy for the network-facing layer.
///
/// Every [`LedgerError`] maps onto exactly one kind, so callers can
/// translate into protocol responses without matching on each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced participant, group, or record does not exist.
    NotFound,
    /// Duplicate registration.
    AlreadyExists,
    /// Caller fails a role predicate (not self, not admin, not member).
    Unauthorized,
    /// Malformed arguments.
    InvalidArgument,
    /// Message index beyond the ledger length.
    IndexOutOfRange,
    /// Persistence failure or ledger shut down.
    Storage,
}

/// Errors produced by ledger operations.
///
/// All errors are synchronous and terminal for the triggering operation;
/// the core never retries.  Mutations either fully commit or fully fail.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("participant {0} is not registered")]
    UnknownParticipant(Address),

    #[error("group {0} does not exist")]
    UnknownGroup(GroupId),

    #[error("participant {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("caller {caller} may not act for {subject}")]
    NotSelf { caller: Address, subject: Address },

    #[error("caller {0} is not the group admin")]
    NotAdmin(Address),

    #[error("{0} is not a member of the group")]
    NotMember(Address),

    #[error("a group needs at least one member")]
    EmptyMembers,

    #[error("display name must not be empty")]
    EmptyName,

    #[error("message index {index} out of range for a log of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("ledger is shut down")]
    Closed,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownParticipant(_) | Self::UnknownGroup(_) => ErrorKind::NotFound,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyExists,
            Self::NotSelf { .. } | Self::NotAdmin(_) | Self::NotMember(_) => {
                ErrorKind::Unauthorized
            }
            Self::EmptyMembers | Self::EmptyName => ErrorKind::InvalidArgument,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::Closed | Self::Store(_) => ErrorKind::Storage,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
