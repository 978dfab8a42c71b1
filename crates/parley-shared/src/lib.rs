//! # parley-shared
//!
//! Identifier types and constants shared by every Parley crate.
//!
//! The ledger core identifies everything by value: participants by a
//! fixed-length [`Address`], two-party conversations by a canonical
//! [`ChatKey`], groups by a generated [`GroupId`].  None of these carry any
//! cryptographic material themselves; authentication happens in the
//! network-facing layer and this crate only sees verified addresses.

pub mod constants;
pub mod types;

mod error;

pub use error::AddressParseError;
pub use types::{Address, ChatKey, ConversationId, GroupId};
