/// Participant address size in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Canonical chat key size in bytes (BLAKE3 output).
pub const CHAT_KEY_SIZE: usize = 32;

/// Key derivation context for chat keys (BLAKE3).
pub const KDF_CONTEXT_CHAT_KEY: &str = "parley-chat-key-v1";

/// Default capacity of the sequencer command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
