// Calldata buffer with backreference tracking.
//
// # Modules
//
// - `config`     : Buffer options and protocol constants
// - `encode_type`: Commit tags and flag cache namespaces
// - `indexes`    : Caller-supplied key -> index tables
// - `references` : Flag caches (value -> committed offset + 1)
// - `buffer`     : Pending/committed stream, search, snapshot/restore

pub mod buffer;
pub mod config;
pub mod encode_type;
pub mod indexes;
pub mod references;

// Re-export key types for convenience.
pub use buffer::{Buffer, Snapshot};
pub use config::{BufferOptions, MIN_REFERENCE_LEN};
pub use encode_type::{EncodeType, FlagNamespace};
#[cfg(feature = "json")]
pub use indexes::IndexesError;
pub use indexes::{IndexTable, Indexes};
pub use references::References;
