//! Feature modules
//!
//! Behaviour layered on top of the editing engine:
//! - Reversible numeric display formatting
//! - Records and the persistence boundary
//! - JSONL export (feature `export`)

#[cfg(feature = "export")]
pub mod export;
pub mod numeric;
pub mod records;

// Re-export commonly used types
pub use numeric::{NumericFormatter, NumericOptions, AUTO_FORMAT_ATTR};
pub use records::{MemoryRecordStore, NewRecord, PendingSave, Record, RecordEditor, RecordStore};
