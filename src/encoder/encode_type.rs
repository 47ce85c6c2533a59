// Commit tags.
//
// The higher-level encoder tags every commit with the kind of value it just
// wrote. The buffer only uses the tag to pick the flag cache (if any) that
// remembers the value.

use std::fmt;
use std::str::FromStr;

/// Kind of value committed by a call to [`Buffer::end`](super::Buffer::end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EncodeType {
    /// Value read from contract storage. Never recorded.
    ReadStorage,
    /// Plain in-calldata value.
    Stateless,
    /// Value that the decompressor writes to contract storage.
    WriteStorage,
}

/// Flag cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagNamespace {
    /// `usedFlags`: values committed as [`EncodeType::Stateless`].
    Stateless,
    /// `usedStorageFlags`: values committed as [`EncodeType::WriteStorage`].
    Storage,
}

impl EncodeType {
    /// All known variants, in discriminant order.
    pub const ALL: [EncodeType; 3] = [
        EncodeType::ReadStorage,
        EncodeType::Stateless,
        EncodeType::WriteStorage,
    ];

    /// The flag cache that records values committed with this tag.
    #[inline]
    pub fn flag_namespace(self) -> Option<FlagNamespace> {
        match self {
            EncodeType::Stateless => Some(FlagNamespace::Stateless),
            EncodeType::WriteStorage => Some(FlagNamespace::Storage),
            EncodeType::ReadStorage => None,
        }
    }

    /// Snake-case name, as used in replay scripts.
    pub fn name(self) -> &'static str {
        match self {
            EncodeType::ReadStorage => "read_storage",
            EncodeType::Stateless => "stateless",
            EncodeType::WriteStorage => "write_storage",
        }
    }
}

impl fmt::Display for EncodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown encode type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encode type '{0}'")]
pub struct UnknownEncodeType(pub String);

impl FromStr for EncodeType {
    type Err = UnknownEncodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "read_storage" | "readstorage" => Ok(EncodeType::ReadStorage),
            "stateless" => Ok(EncodeType::Stateless),
            "write_storage" | "writestorage" => Ok(EncodeType::WriteStorage),
            _ => Err(UnknownEncodeType(s.to_string())),
        }
    }
}
