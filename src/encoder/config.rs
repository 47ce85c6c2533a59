// Buffer configuration and protocol constants.
//
// The reserved selector byte and the flag threshold are part of the wire
// protocol shared with the on-chain decompressor; only the storage mode is
// a per-session choice.

/// Number of bytes reserved at the start of every committed stream.
///
/// The single zero byte is the method selector used when calling the
/// decompressor contract.
pub const RESERVED_SELECTOR_BYTES: usize = 1;

/// Value of the reserved selector byte.
pub const RESERVED_SELECTOR: u8 = 0x00;

/// Shortest uncompressed value recorded in a flag cache.
///
/// A backreference needs 2 bytes to address a flag, so values of 2 bytes
/// or less are never worth pointing back to.
pub const MIN_REFERENCE_LEN: usize = 3;

/// Construction options for a [`Buffer`](super::Buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOptions {
    /// Whether the encoding session may read and write contract storage.
    ///
    /// Stored on the buffer's references for the higher-level encoder;
    /// the buffer itself does not consult it.
    pub use_contract_storage: bool,
    /// Initial capacity reserved for the committed stream.
    pub committed_capacity: usize,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            use_contract_storage: false,
            committed_capacity: 256,
        }
    }
}

impl BufferOptions {
    /// Options with contract storage enabled or disabled, other fields default.
    pub fn with_contract_storage(use_contract_storage: bool) -> Self {
        Self {
            use_contract_storage,
            ..Default::default()
        }
    }
}
