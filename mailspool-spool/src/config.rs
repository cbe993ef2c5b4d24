use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{
    FileBackingStore, MemoryBackingStore, SpoolError, ValidationError,
    spool::{Spool, SpoolKind},
    r#trait::BackingStore,
};

/// Backing stores supplied by the embedding application, by service id
pub type SpoolServices = HashMap<String, Arc<dyn BackingStore>>;

/// Configuration for the spool of one mailer
///
/// File-backed spool in RON config; the mailer name is appended to the path,
/// so several mailers can share one base directory:
/// ```ron
/// spool: Some(File(path: "/var/spool/mailspool")),
/// ```
///
/// Memory-backed spool, flushed at the end of every unit of work:
/// ```ron
/// spool: Some(Memory(capacity: Some(1000))),
/// ```
///
/// A store registered by the application under an id:
/// ```ron
/// spool: Some(Service(id: "redis")),
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum SpoolConfig {
    File {
        path: PathBuf,
    },
    Memory {
        /// Maximum number of messages to store (omit for unlimited)
        #[serde(default)]
        capacity: Option<usize>,
    },
    Service {
        id: String,
    },
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self::Memory { capacity: None }
    }
}

impl SpoolConfig {
    /// Short name of the configured kind
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Memory { .. } => "memory",
            Self::Service { .. } => "service",
        }
    }

    /// Build the spool of mailer `mailer`
    ///
    /// File spools are initialised (directory created, leftovers of crashed
    /// writers removed).
    ///
    /// # Errors
    /// - If the file spool path is invalid or cannot be initialised
    /// - If the service id is not registered in `services`
    pub fn into_spool(self, mailer: &str, services: &SpoolServices) -> crate::Result<SpoolKind> {
        match self {
            Self::File { path } => {
                let store = FileBackingStore::builder().path(path.join(mailer)).build()?;
                let spool = Spool::new(store);
                spool.init()?;
                Ok(SpoolKind::File(spool))
            }
            Self::Memory { capacity } => {
                let store =
                    capacity.map_or_else(MemoryBackingStore::new, MemoryBackingStore::with_capacity);
                Ok(SpoolKind::Memory(Spool::new(store)))
            }
            Self::Service { id } => services
                .get(&id)
                .cloned()
                .map(|store| SpoolKind::Custom(Spool::new(store)))
                .ok_or_else(|| {
                    SpoolError::from(ValidationError::InvalidConfiguration(format!(
                        "No spool service registered as \"{id}\" for mailer {mailer}"
                    )))
                }),
        }
    }
}
