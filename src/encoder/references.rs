// Flag caches for backreferences.
//
// Each cache maps an uncompressed value to a marker: the committed-stream
// offset where the value's encoding starts, plus one. A stored marker of 0
// never happens, so 0 is the "absent" value returned by the raw lookups.

use std::collections::HashMap;
use std::sync::Arc;

use super::encode_type::FlagNamespace;
use super::indexes::Indexes;

/// Offset added to every stored position so that 0 means "not recorded".
pub const FLAG_OFFSET: usize = 1;

/// Backreference bookkeeping owned by a [`Buffer`](super::Buffer).
#[derive(Debug)]
pub struct References {
    use_contract_storage: bool,
    indexes: Arc<Indexes>,
    /// `used_flags[value] = offset + FLAG_OFFSET` for stateless commits.
    used_flags: HashMap<Vec<u8>, usize>,
    /// Same shape, for values written to contract storage.
    used_storage_flags: HashMap<Vec<u8>, usize>,
}

impl References {
    pub(crate) fn new(indexes: Arc<Indexes>, use_contract_storage: bool) -> Self {
        Self {
            use_contract_storage,
            indexes,
            used_flags: HashMap::new(),
            used_storage_flags: HashMap::new(),
        }
    }

    /// Independent copy of both flag caches.
    ///
    /// The storage mode is carried over and the index tables are shared,
    /// so a buffer restored from the copy keeps working as before.
    pub fn copy(&self) -> Self {
        Self {
            use_contract_storage: self.use_contract_storage,
            indexes: Arc::clone(&self.indexes),
            used_flags: self.used_flags.clone(),
            used_storage_flags: self.used_storage_flags.clone(),
        }
    }

    #[inline]
    pub fn use_contract_storage(&self) -> bool {
        self.use_contract_storage
    }

    /// The session's shared index tables.
    #[inline]
    pub fn indexes(&self) -> &Arc<Indexes> {
        &self.indexes
    }

    fn cache(&self, ns: FlagNamespace) -> &HashMap<Vec<u8>, usize> {
        match ns {
            FlagNamespace::Stateless => &self.used_flags,
            FlagNamespace::Storage => &self.used_storage_flags,
        }
    }

    /// Record `value` as starting at committed offset `offset`.
    ///
    /// A value lives in one namespace at a time: recording it here evicts
    /// any entry for the same value from the other cache.
    pub(crate) fn record(&mut self, ns: FlagNamespace, value: &[u8], offset: usize) {
        let marker = offset + FLAG_OFFSET;
        let (cache, other) = match ns {
            FlagNamespace::Stateless => (&mut self.used_flags, &mut self.used_storage_flags),
            FlagNamespace::Storage => (&mut self.used_storage_flags, &mut self.used_flags),
        };
        if other.remove(value).is_some() {
            log::debug!("flag for {} byte value moved to {ns:?} cache", value.len());
        }
        match cache.get_mut(value) {
            Some(slot) => *slot = marker,
            None => {
                cache.insert(value.to_vec(), marker);
            }
        }
    }

    /// Raw marker for `value` in a namespace: `offset + 1`, or 0 if absent.
    #[inline]
    pub fn marker(&self, ns: FlagNamespace, value: &[u8]) -> usize {
        self.cache(ns).get(value).copied().unwrap_or(0)
    }

    /// Raw `usedFlags` marker (0 if absent).
    #[inline]
    pub fn used_flag(&self, value: &[u8]) -> usize {
        self.marker(FlagNamespace::Stateless, value)
    }

    /// Raw `usedStorageFlags` marker (0 if absent).
    #[inline]
    pub fn used_storage_flag(&self, value: &[u8]) -> usize {
        self.marker(FlagNamespace::Storage, value)
    }

    /// Committed offset recorded for `value`, with the marker offset removed.
    pub fn flag_offset(&self, ns: FlagNamespace, value: &[u8]) -> Option<usize> {
        match self.marker(ns, value) {
            0 => None,
            m => Some(m - FLAG_OFFSET),
        }
    }

    /// Number of values recorded in a namespace.
    pub fn flag_count(&self, ns: FlagNamespace) -> usize {
        self.cache(ns).len()
    }

    /// Iterate `(value, marker)` pairs of a namespace in arbitrary order.
    pub fn flags(&self, ns: FlagNamespace) -> impl Iterator<Item = (&[u8], usize)> {
        self.cache(ns).iter().map(|(k, v)| (k.as_slice(), *v))
    }
}

impl Clone for References {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// Equal when both flag caches and the storage mode match and both sides
/// share the same index tables (pointer identity, not table contents).
impl PartialEq for References {
    fn eq(&self, other: &Self) -> bool {
        self.use_contract_storage == other.use_contract_storage
            && Arc::ptr_eq(&self.indexes, &other.indexes)
            && self.used_flags == other.used_flags
            && self.used_storage_flags == other.used_storage_flags
    }
}

impl Eq for References {}
