use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use mailspool_common::{Message, internal};
use tokio::fs;

use crate::{
    SpoolError, ValidationError, record,
    spool::Spool,
    r#trait::BackingStore,
    types::{CORRUPT_SUFFIX, SpooledMessageId, TEMP_PREFIX},
};

/// File-based backing store implementation
///
/// One file per queued message, named `{ulid}.message`, holding a record as
/// produced by [`record::encode`]. Because ULIDs sort by creation time, a
/// sorted directory listing is the queue order.
///
/// # Claiming
/// A flusher claims a record by renaming it to `{ulid}.message.sending`. The
/// rename is atomic, so when several processes flush the same directory only
/// one of them wins each record; the others see `NotFound` and move on. A
/// claimed record is removed after a successful send or renamed back after a
/// failed one. Claims abandoned by a crashed flusher are returned to the queue
/// by [`BackingStore::recover`].
///
/// # Atomicity
/// Writes go to `.tmp_{ulid}.message` first and are renamed into place, so a
/// partially written record is never visible to `list()`.
#[derive(Debug, Clone)]
pub struct FileBackingStore {
    path: PathBuf,
}

impl Default for FileBackingStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/spool/mailspool"),
        }
    }
}

impl FileBackingStore {
    /// Validate a spool path
    ///
    /// - Rejects paths containing `..` (directory traversal)
    /// - Rejects relative paths
    /// - Rejects paths inside system directories
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    fn validate_path(path: &Path) -> Result<(), ValidationError> {
        for component in path.components() {
            if component == std::path::Component::ParentDir {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "Spool path cannot contain '..' components: {}",
                    path.display()
                )));
            }
        }

        if !path.is_absolute() {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Spool path must be absolute: {}",
                path.display()
            )));
        }

        let sensitive_prefixes = [
            "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
        ];

        for prefix in &sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "Spool path cannot be in system directory {prefix}: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Create a new `FileBackingStore` builder
    #[must_use]
    pub fn builder() -> FileBackingStoreBuilder {
        FileBackingStoreBuilder::default()
    }

    /// The spool directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Initialize the file-backed spool
    ///
    /// Creates the spool directory if it doesn't exist and validates that
    /// the path is actually a directory. Also removes temporary files left
    /// behind by writers that crashed mid-write.
    ///
    /// # Errors
    /// - If the spool path cannot be created
    /// - If the path exists but is not a directory
    pub fn init(&self) -> crate::Result<()> {
        internal!("Initialising spool at {}", self.path.display());

        if !self.path.try_exists()? {
            internal!("{} does not exist, creating...", self.path.display());
            std::fs::create_dir_all(&self.path)?;
        } else if !self.path.is_dir() {
            return Err(ValidationError::NotDirectory(self.path.display().to_string()).into());
        }

        self.cleanup_temp_files()?;

        Ok(())
    }

    fn cleanup_temp_files(&self) -> crate::Result<()> {
        let mut cleaned = 0;

        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                std::fs::remove_file(entry.path())?;
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            internal!(
                level = INFO,
                "Cleaned up {cleaned} partially written records from {}",
                self.path.display()
            );
        }

        Ok(())
    }

    fn queued_path(&self, id: &SpooledMessageId) -> PathBuf {
        self.path.join(id.filename())
    }

    fn claimed_path(&self, id: &SpooledMessageId) -> PathBuf {
        self.path.join(id.claimed_filename())
    }

    fn corrupt_path(&self, id: &SpooledMessageId) -> PathBuf {
        self.path.join(format!("{id}{CORRUPT_SUFFIX}"))
    }

    /// Stamp a claimed record with the claim time, so `recover` measures how
    /// long it has been claimed rather than how long it was queued.
    async fn touch(path: &Path) -> io::Result<()> {
        let file = fs::OpenOptions::new().write(true).open(path).await?;
        file.into_std().await.set_modified(SystemTime::now())
    }

    async fn read_record(&self, path: &Path, id: &SpooledMessageId) -> crate::Result<Message> {
        let bytes = fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SpoolError::NotFound(id.clone()),
            _ => SpoolError::Io(e),
        })?;

        Ok(record::decode(&bytes)?)
    }
}

#[async_trait]
impl BackingStore for FileBackingStore {
    async fn write(&self, message: &Message) -> crate::Result<SpooledMessageId> {
        let id = SpooledMessageId::generate();
        let final_path = self.queued_path(&id);
        let temp_path = self.path.join(format!("{TEMP_PREFIX}{}", id.filename()));

        let record = record::encode(message)?;
        fs::write(&temp_path, &record).await?;
        fs::rename(&temp_path, &final_path).await?;

        internal!(
            level = DEBUG,
            "Spooled message {id} to {}",
            final_path.display()
        );

        Ok(id)
    }

    async fn list(&self) -> crate::Result<Vec<SpooledMessageId>> {
        let mut entries = fs::read_dir(&self.path).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();

            if !filename.starts_with(TEMP_PREFIX)
                && let Some(id) = SpooledMessageId::from_filename(&filename)
            {
                ids.push(id);
            }
        }

        ids.sort();

        Ok(ids)
    }

    async fn read(&self, id: &SpooledMessageId) -> crate::Result<Message> {
        self.read_record(&self.queued_path(id), id).await
    }

    async fn claim(&self, id: &SpooledMessageId) -> crate::Result<Option<Message>> {
        let claimed = self.claimed_path(id);

        match fs::rename(self.queued_path(id), &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        Self::touch(&claimed).await?;

        match self.read_record(&claimed, id).await {
            Ok(message) => Ok(Some(message)),
            Err(SpoolError::Serialization(e)) => {
                fs::rename(&claimed, self.corrupt_path(id)).await?;
                internal!(
                    level = WARN,
                    "Quarantined unreadable record {id} in {}: {e}",
                    self.path.display()
                );
                Err(SpoolError::Serialization(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn release(&self, id: &SpooledMessageId, _message: Message) -> crate::Result<()> {
        fs::rename(self.claimed_path(id), self.queued_path(id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SpoolError::NotFound(id.clone()),
                _ => SpoolError::Io(e),
            })
    }

    async fn complete(&self, id: &SpooledMessageId) -> crate::Result<()> {
        fs::remove_file(self.claimed_path(id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SpoolError::NotFound(id.clone()),
                _ => SpoolError::Io(e),
            })
    }

    async fn recover(&self, timeout: Duration) -> crate::Result<usize> {
        let mut entries = fs::read_dir(&self.path).await?;
        let now = SystemTime::now();
        let mut recovered = 0;

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let Some(id) = SpooledMessageId::from_claimed_filename(&filename.to_string_lossy())
            else {
                continue;
            };

            let claimed_at = entry.metadata().await?.modified()?;
            let age = now.duration_since(claimed_at).unwrap_or_default();
            if age <= timeout {
                continue;
            }

            match fs::rename(entry.path(), self.queued_path(&id)).await {
                Ok(()) => recovered += 1,
                // Completed or released by its flusher in the meantime
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if recovered > 0 {
            internal!(
                level = INFO,
                "Recovered {recovered} abandoned claims in {}",
                self.path.display()
            );
        }

        Ok(recovered)
    }
}

/// Builder for `FileBackingStore`
#[derive(Debug, Default)]
pub struct FileBackingStoreBuilder {
    path: PathBuf,
}

impl FileBackingStoreBuilder {
    /// Set the spool directory path
    #[must_use]
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Build the final `FileBackingStore`
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    pub fn build(self) -> crate::Result<FileBackingStore> {
        FileBackingStore::validate_path(&self.path)?;
        Ok(FileBackingStore { path: self.path })
    }
}

impl Spool<FileBackingStore> {
    /// Initialize the file-backed spool
    ///
    /// # Errors
    /// Returns an error if initialization fails
    pub fn init(&self) -> crate::Result<()> {
        self.store().init()
    }
}

/// Type alias for file-backed spool
pub type FileSpool = Spool<FileBackingStore>;
