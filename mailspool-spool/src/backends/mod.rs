//! Backend storage implementations for the spool system
//!
//! - `memory`: in-process queue, drained by the end-of-unit-of-work flush
//! - `file`: one record per message in a directory, drained by `spool send`

pub mod file;
pub mod memory;

pub use file::{FileBackingStore, FileBackingStoreBuilder, FileSpool};
pub use memory::MemoryBackingStore;
