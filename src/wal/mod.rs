//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging: every
//! mutation is appended and fsynced before it is applied to the memtable.
//!
//! ## Responsibilities
//! - Append records before any mutation is visible
//! - Crash recovery and replay, best-effort around corruption
//! - Truncation once a flush has made the data durable elsewhere
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ timestamp (8) │ op_len (2) │ op │ key_len (4) │ key │      │
//! │ val_len (4) │ value                                        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//! All integers are big-endian. Records are packed with no padding; the
//! reader determines record boundaries from the nested length prefixes.

pub(crate) mod entry;
pub(crate) mod writer;
pub(crate) mod reader;
pub mod recovery;

pub use entry::{Operation, Record};
pub use writer::WalWriter;
pub use reader::{WalIterator, WalReader};
pub use recovery::RecoveryResult;
