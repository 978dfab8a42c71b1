use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ADDRESS_SIZE, CHAT_KEY_SIZE, KDF_CONTEXT_CHAT_KEY};
use crate::error::AddressParseError;

// Participant identity = fixed-length 20-byte account address.
//
// The address is opaque to the ledger: the authenticator in the network
// layer vouches that a request really comes from it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != ADDRESS_SIZE {
            return Err(AddressParseError::BadLength { got: bytes.len() });
        }
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Canonical identifier for a two-party conversation.
///
/// The pair is sorted before hashing, so `between(a, b) == between(b, a)` and
/// both directions of a chat land in the same ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChatKey(pub [u8; CHAT_KEY_SIZE]);

impl ChatKey {
    /// Derive the chat key for an unordered pair of addresses.
    pub fn between(a: Address, b: Address) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_CHAT_KEY);
        hasher.update(&lo.0);
        hasher.update(&hi.0);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ChatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Unique group identifier, independent of the group name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GroupId(pub Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either side of the archive store's key: a direct chat or a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Direct(ChatKey),
    Group(GroupId),
}

impl ConversationId {
    /// Stable text encoding used as the storage key.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Direct(key) => format!("dm:{}", key),
            Self::Group(id) => format!("group:{}", id),
        }
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn random_address() -> Address {
        let mut bytes = [0u8; ADDRESS_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Address(bytes)
    }

    #[test]
    fn test_address_hex_round_trip() {
        let addr = random_address();
        let restored = Address::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, restored);
    }

    #[test]
    fn test_address_accepts_0x_prefix() {
        let addr = random_address();
        let prefixed = format!("0x{}", addr.to_hex());
        assert_eq!(Address::from_hex(&prefixed).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(Address::from_hex("abcd").is_err());
        assert!(Address::from_hex(&"ab".repeat(32)).is_err());
    }

    #[test]
    fn test_chat_key_symmetric() {
        let a = random_address();
        let b = random_address();
        assert_eq!(ChatKey::between(a, b), ChatKey::between(b, a));
    }

    #[test]
    fn test_chat_key_distinct_pairs() {
        let a = random_address();
        let b = random_address();
        let c = random_address();
        assert_ne!(ChatKey::between(a, b), ChatKey::between(a, c));
    }

    #[test]
    fn test_chat_key_deterministic() {
        let a = Address([0x11; ADDRESS_SIZE]);
        let b = Address([0x22; ADDRESS_SIZE]);
        assert_eq!(ChatKey::between(a, b), ChatKey::between(a, b));
    }

    #[test]
    fn test_conversation_id_storage_keys_disjoint() {
        let key = ChatKey::between(random_address(), random_address());
        let dm = ConversationId::Direct(key).storage_key();
        let group = ConversationId::Group(GroupId::new()).storage_key();
        assert!(dm.starts_with("dm:"));
        assert!(group.starts_with("group:"));
    }

    #[test]
    fn test_address_serde_round_trip() {
        let addr = random_address();
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
