//! Authorization and precondition checks.
//!
//! Every mutating operation runs the relevant checks here before it touches
//! state, so "you can't do this" surfaces as [`LedgerError::NotSelf`],
//! [`LedgerError::NotAdmin`] or [`LedgerError::NotMember`], distinct from
//! "this doesn't exist".

use parley_shared::Address;
use parley_store::Group;

use crate::error::{LedgerError, Result};
use crate::state::LedgerState;

pub(crate) fn ensure_registered(state: &LedgerState, address: Address) -> Result<()> {
    if state.exists(address) {
        Ok(())
    } else {
        Err(LedgerError::UnknownParticipant(address))
    }
}

pub(crate) fn ensure_self(caller: Address, subject: Address) -> Result<()> {
    if caller == subject {
        Ok(())
    } else {
        Err(LedgerError::NotSelf { caller, subject })
    }
}

pub(crate) fn ensure_admin(group: &Group, caller: Address) -> Result<()> {
    if group.admin == caller {
        Ok(())
    } else {
        Err(LedgerError::NotAdmin(caller))
    }
}

pub(crate) fn ensure_member(group: &Group, address: Address) -> Result<()> {
    if group.is_member(address) {
        Ok(())
    } else {
        Err(LedgerError::NotMember(address))
    }
}

pub(crate) fn ensure_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(LedgerError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::constants::ADDRESS_SIZE;
    use parley_shared::GroupId;

    fn addr(byte: u8) -> Address {
        Address([byte; ADDRESS_SIZE])
    }

    #[test]
    fn admin_and_member_checks_are_independent() {
        let group = Group {
            id: GroupId::new(),
            name: "g".into(),
            description: String::new(),
            members: vec![addr(1)],
            admin: addr(2),
        };
        // The admin is not automatically a member.
        assert!(ensure_admin(&group, addr(2)).is_ok());
        assert!(ensure_member(&group, addr(2)).is_err());
        assert!(ensure_member(&group, addr(1)).is_ok());
        assert!(ensure_admin(&group, addr(1)).is_err());
    }

    #[test]
    fn index_bound_is_exclusive() {
        assert!(ensure_index(0, 1).is_ok());
        assert!(matches!(
            ensure_index(1, 1),
            Err(LedgerError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}
