//! Oxicalldata: backreference-aware calldata buffer.
//!
//! The crate provides:
//! - The encoding buffer with flag caches and checkpoints (`encoder`)
//! - JSON replay scripts for driving a buffer from outside Rust (`replay`,
//!   `json` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use oxicalldata::encoder::{Buffer, EncodeType, Indexes};
//!
//! let mut buf = Buffer::new(Arc::new(Indexes::new()), false);
//!
//! let snap = buf.snapshot();
//! buf.write_bytes(&[0xde, 0xad, 0xbe, 0xef]);
//! buf.end(b"\xde\xad\xbe\xef", EncodeType::Stateless);
//! assert_eq!(buf.len(), 5);
//!
//! // Roll the attempt back.
//! buf.restore(snap);
//! assert_eq!(buf.data(), &[0x00]);
//! ```

pub mod encoder;

#[cfg(feature = "json")]
pub mod replay;

#[cfg(feature = "cli")]
pub mod cli;
