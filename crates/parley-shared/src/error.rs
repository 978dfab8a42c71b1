use thiserror::Error;

use crate::constants::ADDRESS_SIZE;

#[derive(Error, Debug)]
pub enum AddressParseError {
    #[error("expected {expected} bytes, got {got}", expected = ADDRESS_SIZE)]
    BadLength { got: usize },

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}
