//! Read-only view of a file spool for operators.

use mailspool_common::{Message, internal};

use crate::{FileBackingStore, SpoolError, SpooledMessageId, r#trait::BackingStore};

/// Snapshot of the queued records of a file spool
#[derive(Debug, Default)]
pub struct SpoolInspection {
    /// Decoded messages, in queue order, at most `limit` of them
    pub entries: Vec<(SpooledMessageId, Message)>,
    /// Every queued record, readable or not
    pub total: usize,
    /// Records within the limit that could not be read
    pub unreadable: usize,
    /// The message limit the snapshot was taken with (0 = unlimited)
    pub limit: usize,
}

impl SpoolInspection {
    /// Records left out because of the message limit
    #[must_use]
    pub const fn not_displayed(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.total.saturating_sub(self.limit)
        }
    }
}

impl FileBackingStore {
    /// Decode up to `max_messages` queued records (0 = all of them)
    ///
    /// Records that vanish or fail to decode are skipped and counted in
    /// [`SpoolInspection::unreadable`]. The directory is never modified.
    ///
    /// # Errors
    /// If the spool directory cannot be listed
    pub async fn inspect(&self, max_messages: usize) -> crate::Result<SpoolInspection> {
        let ids = self.list().await?;
        let shown = if max_messages == 0 {
            ids.len()
        } else {
            max_messages.min(ids.len())
        };

        let mut inspection = SpoolInspection {
            entries: Vec::with_capacity(shown),
            total: ids.len(),
            unreadable: 0,
            limit: max_messages,
        };

        for id in ids.into_iter().take(shown) {
            match self.read(&id).await {
                Ok(message) => inspection.entries.push((id, message)),
                Err(e @ (SpoolError::Serialization(_) | SpoolError::NotFound(_) | SpoolError::Io(_))) => {
                    internal!(level = WARN, "Cannot read spooled message {id}: {e}");
                    inspection.unreadable += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(inspection)
    }
}
