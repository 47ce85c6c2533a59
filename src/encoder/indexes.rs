// Index tables supplied by the caller.
//
// Three key -> index maps, one per value domain. The buffer never mutates
// them; a session shares one table between its buffer, every reference copy
// and every snapshot through `Arc<Indexes>`.

use std::collections::HashMap;

/// Width of an address key.
pub const ADDRESS_LEN: usize = 20;
/// Width of a 32-byte word key.
pub const BYTES32_LEN: usize = 32;
/// Width of a 4-byte key (function selectors).
pub const BYTES4_LEN: usize = 4;

/// Which index table a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexTable {
    Address,
    Bytes32,
    Bytes4,
}

impl IndexTable {
    pub const ALL: [IndexTable; 3] = [
        IndexTable::Address,
        IndexTable::Bytes32,
        IndexTable::Bytes4,
    ];

    /// Key width for this table.
    pub fn key_len(self) -> usize {
        match self {
            IndexTable::Address => ADDRESS_LEN,
            IndexTable::Bytes32 => BYTES32_LEN,
            IndexTable::Bytes4 => BYTES4_LEN,
        }
    }

    /// Name used in JSON documents.
    pub fn name(self) -> &'static str {
        match self {
            IndexTable::Address => "address",
            IndexTable::Bytes32 => "bytes32",
            IndexTable::Bytes4 => "bytes4",
        }
    }

    /// Parse a table name as written in JSON documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "address" | "addresses" => Some(IndexTable::Address),
            "bytes32" => Some(IndexTable::Bytes32),
            "bytes4" => Some(IndexTable::Bytes4),
            _ => None,
        }
    }
}

/// Key -> index tables for addresses, 32-byte words and 4-byte values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indexes {
    address: HashMap<Vec<u8>, u64>,
    bytes32: HashMap<Vec<u8>, u64>,
    bytes4: HashMap<Vec<u8>, u64>,
}

impl Indexes {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, table: IndexTable) -> &HashMap<Vec<u8>, u64> {
        match table {
            IndexTable::Address => &self.address,
            IndexTable::Bytes32 => &self.bytes32,
            IndexTable::Bytes4 => &self.bytes4,
        }
    }

    fn table_mut(&mut self, table: IndexTable) -> &mut HashMap<Vec<u8>, u64> {
        match table {
            IndexTable::Address => &mut self.address,
            IndexTable::Bytes32 => &mut self.bytes32,
            IndexTable::Bytes4 => &mut self.bytes4,
        }
    }

    /// Insert a key, returning the index it replaced.
    pub fn insert(
        &mut self,
        table: IndexTable,
        key: impl Into<Vec<u8>>,
        index: u64,
    ) -> Option<u64> {
        self.table_mut(table).insert(key.into(), index)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, table: IndexTable, key: impl Into<Vec<u8>>, index: u64) -> Self {
        self.insert(table, key, index);
        self
    }

    /// Look up a key.
    #[inline]
    pub fn get(&self, table: IndexTable, key: &[u8]) -> Option<u64> {
        self.table(table).get(key).copied()
    }

    #[inline]
    pub fn address_index(&self, key: &[u8]) -> Option<u64> {
        self.get(IndexTable::Address, key)
    }

    #[inline]
    pub fn bytes32_index(&self, key: &[u8]) -> Option<u64> {
        self.get(IndexTable::Bytes32, key)
    }

    #[inline]
    pub fn bytes4_index(&self, key: &[u8]) -> Option<u64> {
        self.get(IndexTable::Bytes4, key)
    }

    /// Number of keys in one table.
    pub fn table_len(&self, table: IndexTable) -> usize {
        self.table(table).len()
    }

    /// Total number of keys across all tables.
    pub fn len(&self) -> usize {
        self.address.len() + self.bytes32.len() + self.bytes4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// JSON loading
// ---------------------------------------------------------------------------

/// Errors from [`Indexes::from_json`].
#[cfg(feature = "json")]
#[derive(Debug, thiserror::Error)]
pub enum IndexesError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object of tables")]
    NotAnObject,
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("table '{0}' must be a JSON object")]
    TableNotAnObject(&'static str),
    #[error("{table}: invalid hex key '{key}': {source}")]
    InvalidKey {
        table: &'static str,
        key: String,
        source: hex::FromHexError,
    },
    #[error("{table}: key '{key}' is {got} bytes, expected {expected}")]
    KeyWidth {
        table: &'static str,
        key: String,
        got: usize,
        expected: usize,
    },
    #[error("{table}: index for '{key}' must be a non-negative integer")]
    InvalidIndex { table: &'static str, key: String },
}

/// Decode a hex string with an optional `0x` prefix.
#[cfg(feature = "json")]
pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(s)
}

#[cfg(feature = "json")]
impl Indexes {
    /// Parse tables from a JSON document of the form
    /// `{"address": {"0x..": 0}, "bytes32": {..}, "bytes4": {..}}`.
    ///
    /// Missing tables are empty.
    pub fn from_json(text: &str) -> Result<Self, IndexesError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    /// Like [`from_json`](Self::from_json), from an already parsed value.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, IndexesError> {
        let root = value.as_object().ok_or(IndexesError::NotAnObject)?;
        let mut indexes = Indexes::new();

        for (name, entries) in root {
            let table = IndexTable::from_name(name)
                .ok_or_else(|| IndexesError::UnknownTable(name.clone()))?;
            let table_name = table.name();
            let entries = entries
                .as_object()
                .ok_or(IndexesError::TableNotAnObject(table_name))?;

            for (key, index) in entries {
                let bytes = decode_hex(key).map_err(|source| IndexesError::InvalidKey {
                    table: table_name,
                    key: key.clone(),
                    source,
                })?;
                if bytes.len() != table.key_len() {
                    return Err(IndexesError::KeyWidth {
                        table: table_name,
                        key: key.clone(),
                        got: bytes.len(),
                        expected: table.key_len(),
                    });
                }
                let index = index.as_u64().ok_or_else(|| IndexesError::InvalidIndex {
                    table: table_name,
                    key: key.clone(),
                })?;
                indexes.insert(table, bytes, index);
            }
        }

        log::debug!(
            "loaded indexes: {} addresses, {} bytes32, {} bytes4",
            indexes.address.len(),
            indexes.bytes32.len(),
            indexes.bytes4.len()
        );
        Ok(indexes)
    }
}
