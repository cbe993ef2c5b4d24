use std::{sync::Arc, time::Duration};

use mailspool_common::{Message, Transport, internal};

use crate::{
    FileBackingStore, MemoryBackingStore, SpooledMessageId,
    flush::{self, FlushOptions, FlushReport},
    r#trait::BackingStore,
};

/// A queue of messages waiting to be sent, over some backing store
#[derive(Debug, Clone)]
pub struct Spool<T: BackingStore> {
    store: T,
}

impl<T: BackingStore> Spool<T> {
    pub const fn new(store: T) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &T {
        &self.store
    }

    /// Append a message to the queue
    ///
    /// # Errors
    /// If the backing store cannot hold the message
    pub async fn enqueue(&self, message: &Message) -> crate::Result<SpooledMessageId> {
        let id = self.store.write(message).await?;
        internal!(level = DEBUG, "Enqueued message {id}");
        Ok(id)
    }

    /// Send every queued message through `transport`
    ///
    /// See [`flush::flush_queue`].
    ///
    /// # Errors
    /// If the transport cannot be started, its connection fails, or the store fails
    pub async fn flush_queue(
        &self,
        transport: &dyn Transport,
        options: &FlushOptions,
    ) -> crate::Result<FlushReport> {
        flush::flush_queue(&self.store, transport, options).await
    }

    /// Return claims abandoned for longer than `timeout` to the queue
    ///
    /// # Errors
    /// If the store cannot be scanned
    pub async fn recover(&self, timeout: Duration) -> crate::Result<usize> {
        self.store.recover(timeout).await
    }

    /// Number of queued messages
    ///
    /// # Errors
    /// If the store cannot be read
    pub async fn len(&self) -> crate::Result<usize> {
        self.store.len().await
    }

    /// Whether `id` is still waiting in the queue (not sent, not claimed)
    ///
    /// # Errors
    /// If the store cannot be read
    pub async fn is_queued(&self, id: &SpooledMessageId) -> crate::Result<bool> {
        Ok(self.store.list().await?.contains(id))
    }
}

/// Type alias for memory-backed spool
pub type MemorySpool = Spool<MemoryBackingStore>;

/// Type alias for a spool provided by the embedding application
pub type CustomSpool = Spool<Arc<dyn BackingStore>>;

/// The spool of a mailer, by kind
///
/// The kind decides what operators can do with it: only memory spools are
/// flushed automatically at the end of a unit of work, and only file spools
/// can be inspected.
#[derive(Debug, Clone)]
pub enum SpoolKind {
    File(Spool<FileBackingStore>),
    Memory(MemorySpool),
    Custom(CustomSpool),
}

impl SpoolKind {
    /// Short name of the kind, as shown to operators
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory(_) => "memory",
            Self::Custom(_) => "service",
        }
    }

    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    /// # Errors
    /// If the backing store cannot hold the message
    pub async fn enqueue(&self, message: &Message) -> crate::Result<SpooledMessageId> {
        match self {
            Self::File(spool) => spool.enqueue(message).await,
            Self::Memory(spool) => spool.enqueue(message).await,
            Self::Custom(spool) => spool.enqueue(message).await,
        }
    }

    /// # Errors
    /// See [`Spool::flush_queue`]
    pub async fn flush_queue(
        &self,
        transport: &dyn Transport,
        options: &FlushOptions,
    ) -> crate::Result<FlushReport> {
        match self {
            Self::File(spool) => spool.flush_queue(transport, options).await,
            Self::Memory(spool) => spool.flush_queue(transport, options).await,
            Self::Custom(spool) => spool.flush_queue(transport, options).await,
        }
    }

    /// # Errors
    /// If the store cannot be scanned
    pub async fn recover(&self, timeout: Duration) -> crate::Result<usize> {
        match self {
            Self::File(spool) => spool.recover(timeout).await,
            Self::Memory(spool) => spool.recover(timeout).await,
            Self::Custom(spool) => spool.recover(timeout).await,
        }
    }

    /// # Errors
    /// If the store cannot be read
    pub async fn len(&self) -> crate::Result<usize> {
        match self {
            Self::File(spool) => spool.len().await,
            Self::Memory(spool) => spool.len().await,
            Self::Custom(spool) => spool.len().await,
        }
    }

    /// # Errors
    /// If the store cannot be read
    pub async fn is_queued(&self, id: &SpooledMessageId) -> crate::Result<bool> {
        match self {
            Self::File(spool) => spool.is_queued(id).await,
            Self::Memory(spool) => spool.is_queued(id).await,
            Self::Custom(spool) => spool.is_queued(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use mailspool_common::{Mailbox, MockTransport};

    use super::*;

    #[tokio::test]
    async fn test_custom_spool_flushes_through_trait_object() {
        let store: Arc<dyn BackingStore> = Arc::new(MemoryBackingStore::new());
        let spool = SpoolKind::Custom(Spool::new(store));
        let transport = MockTransport::new();

        spool
            .enqueue(&Message::builder().to(Mailbox::new("a@x.com")).build())
            .await
            .expect("enqueue");
        assert_eq!(spool.len().await.expect("len"), 1);

        let report = spool
            .flush_queue(&transport, &FlushOptions::default())
            .await
            .expect("flush");

        assert_eq!(report.sent, 1);
        assert_eq!(spool.kind_name(), "service");
        assert!(!spool.is_memory());
        assert_eq!(spool.len().await.expect("len"), 0);
    }
}
