// Committed/pending byte buffer with flag-cache bookkeeping.
//
// The encoder stages the bytes of one value in `pending`, then calls `end`
// with the original (uncompressed) value. `end` records where the value's
// encoding starts and moves the staged bytes into `committed`.
//
// `snapshot` / `restore` checkpoint the committed stream and the flag
// caches so an encoding attempt can be rolled back. Pending bytes are not
// part of a checkpoint.

use std::sync::Arc;

use super::config::{
    BufferOptions, MIN_REFERENCE_LEN, RESERVED_SELECTOR, RESERVED_SELECTOR_BYTES,
};
use super::encode_type::EncodeType;
use super::indexes::Indexes;
use super::references::References;

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Calldata buffer.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use oxicalldata::encoder::{Buffer, EncodeType, Indexes};
///
/// let mut buf = Buffer::new(Arc::new(Indexes::new()), false);
/// buf.write_bytes(&[0x01, 0x02, 0x03, 0x04]);
/// buf.end(b"ABCD", EncodeType::Stateless);
///
/// assert_eq!(buf.data(), &[0x00, 0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(buf.refs().used_flag(b"ABCD"), 2);
/// assert_eq!(buf.find_past_data(&[0x02, 0x03]), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct Buffer {
    committed: Vec<u8>,
    pending: Vec<u8>,
    refs: References,
}

impl Buffer {
    /// New buffer holding only the reserved selector byte.
    pub fn new(indexes: Arc<Indexes>, use_contract_storage: bool) -> Self {
        Self::with_options(
            indexes,
            BufferOptions::with_contract_storage(use_contract_storage),
        )
    }

    /// New buffer with explicit options.
    pub fn with_options(indexes: Arc<Indexes>, opts: BufferOptions) -> Self {
        let capacity = opts.committed_capacity.max(RESERVED_SELECTOR_BYTES);
        let mut committed = Vec::with_capacity(capacity);
        committed.resize(RESERVED_SELECTOR_BYTES, RESERVED_SELECTOR);
        Self {
            committed,
            pending: Vec::new(),
            refs: References::new(indexes, opts.use_contract_storage),
        }
    }

    /// Committed stream, starting with the reserved selector byte.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.committed
    }

    /// Committed length, including the reserved selector byte.
    #[inline]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Always `false`: the reserved selector byte is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Bytes staged since the last commit.
    #[inline]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flag caches, storage mode and index tables.
    #[inline]
    pub fn refs(&self) -> &References {
        &self.refs
    }

    /// Consume the buffer and return the committed stream.
    ///
    /// Pending bytes are dropped.
    pub fn into_data(self) -> Vec<u8> {
        self.committed
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        self.pending.push(b);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Stage the low 8 bits of `i` as a single byte.
    ///
    /// Only meant for small indexes: values above 255 are truncated, not
    /// rejected.
    #[inline]
    pub fn write_int(&mut self, i: u64) {
        self.write_byte(i as u8);
    }

    /// Drop staged bytes without committing them.
    pub fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            log::trace!("discarding {} pending bytes", self.pending.len());
        }
        self.pending = Vec::new();
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Lowest committed offset where `data` occurs.
    ///
    /// Only windows ending strictly before the last committed byte are
    /// considered, so a match that is a suffix of the stream is not found.
    /// An empty pattern matches at offset 0. Cost is
    /// O(committed length * pattern length).
    pub fn find_past_data(&self, data: &[u8]) -> Option<usize> {
        let n = data.len();
        let mut i = 0;
        while i + n < self.committed.len() {
            if self.committed[i..i + n] == *data {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Commit the pending bytes as the encoding of `uncompressed`.
    ///
    /// Values of at least [`MIN_REFERENCE_LEN`] bytes are recorded in the
    /// flag cache selected by `encode_type`, keyed by `uncompressed` and
    /// pointing at the committed offset where the pending bytes land.
    pub fn end(&mut self, uncompressed: &[u8], encode_type: EncodeType) {
        if uncompressed.len() >= MIN_REFERENCE_LEN {
            let rindex = self.len();
            if let Some(ns) = encode_type.flag_namespace() {
                log::debug!(
                    "flag {ns:?}: {} byte value at offset {rindex}",
                    uncompressed.len()
                );
                self.refs.record(ns, uncompressed, rindex);
            }
        }

        log::trace!(
            "commit {} bytes ({encode_type}) at offset {}",
            self.pending.len(),
            self.committed.len()
        );
        self.committed.extend_from_slice(&self.pending);
        self.pending = Vec::new();
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    /// Capture the committed stream and flag caches.
    ///
    /// Pending bytes are not captured.
    pub fn snapshot(&self) -> Snapshot {
        log::debug!(
            "snapshot at {} committed bytes ({} pending not captured)",
            self.committed.len(),
            self.pending.len()
        );
        Snapshot {
            committed: self.committed.clone(),
            refs: self.refs.copy(),
        }
    }

    /// Replace the committed stream and flag caches with a snapshot's.
    ///
    /// Pending bytes are left as they are.
    pub fn restore(&mut self, snap: Snapshot) {
        log::debug!(
            "restore {} -> {} committed bytes",
            self.committed.len(),
            snap.committed.len()
        );
        self.committed = snap.committed;
        self.refs = snap.refs;
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Owned copy of a buffer's committed stream and flag caches.
///
/// Shares the index tables with the buffer it was taken from; everything
/// else is independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    committed: Vec<u8>,
    refs: References,
}

impl Snapshot {
    /// Captured committed stream.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.committed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Captured flag caches.
    #[inline]
    pub fn refs(&self) -> &References {
        &self.refs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
