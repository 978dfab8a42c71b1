//! # parley-store
//!
//! SQLite persistence for the Parley ledger core.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  The ledger's operation sequencer writes through this handle one
//! committed operation at a time, so the store never sees concurrent
//! writers; multi-statement operations still run inside a transaction so a
//! crash cannot leave a half-applied group behind.

pub mod archive;
pub mod chats;
pub mod database;
pub mod groups;
pub mod migrations;
pub mod models;
pub mod participants;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
