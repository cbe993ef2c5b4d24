pub mod backends;
pub mod config;
pub mod error;
pub mod flush;
pub mod inspect;
pub mod record;
pub mod spool;
pub mod r#trait;
pub mod types;

pub use backends::{FileBackingStore, FileBackingStoreBuilder, FileSpool, MemoryBackingStore};
pub use config::{SpoolConfig, SpoolServices};
pub use error::{Result, SerializationError, SpoolError, ValidationError};
pub use flush::{FailedMessage, FlushOptions, FlushReport, StopReason, flush_queue};
pub use inspect::SpoolInspection;
pub use spool::{CustomSpool, MemorySpool, Spool, SpoolKind};
pub use r#trait::BackingStore;
pub use types::SpooledMessageId;
