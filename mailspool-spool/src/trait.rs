use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mailspool_common::Message;

use crate::types::SpooledMessageId;

/// Storage behind a spool
///
/// Records move through three states: queued (visible to [`list`](Self::list)),
/// claimed (taken by a flusher, invisible to everyone else) and gone. A flusher
/// must [`claim`](Self::claim) a record before sending it and then either
/// [`complete`](Self::complete) it or [`release`](Self::release) it back to
/// the queue, so two flushers never send the same record.
#[async_trait]
pub trait BackingStore: Send + Sync + std::fmt::Debug {
    /// Append a message to the queue
    ///
    /// # Errors
    /// If the store cannot persist the message
    async fn write(&self, message: &Message) -> crate::Result<SpooledMessageId>;

    /// Queued (unclaimed) message IDs, in enqueue order
    ///
    /// # Errors
    /// If the store cannot be read
    async fn list(&self) -> crate::Result<Vec<SpooledMessageId>>;

    /// Read a queued message without claiming it
    ///
    /// # Errors
    /// If the message does not exist or cannot be decoded
    async fn read(&self, id: &SpooledMessageId) -> crate::Result<Message>;

    /// Take a queued message out of the queue for sending
    ///
    /// Returns `Ok(None)` if the message is no longer queued, typically
    /// because another flusher claimed it first.
    ///
    /// # Errors
    /// If the claim cannot be recorded or the claimed message cannot be decoded
    async fn claim(&self, id: &SpooledMessageId) -> crate::Result<Option<Message>>;

    /// Put a claimed message back into the queue at its original position
    ///
    /// # Errors
    /// If the message was not claimed or cannot be restored
    async fn release(&self, id: &SpooledMessageId, message: Message) -> crate::Result<()>;

    /// Forget a claimed message after it has been sent
    ///
    /// # Errors
    /// If the message was not claimed or cannot be removed
    async fn complete(&self, id: &SpooledMessageId) -> crate::Result<()>;

    /// Return claims older than `timeout` to the queue, for flushers that died
    /// mid-flush. Returns the number of recovered messages.
    ///
    /// # Errors
    /// If the store cannot be scanned
    async fn recover(&self, _timeout: Duration) -> crate::Result<usize> {
        Ok(0)
    }

    /// Number of queued messages
    ///
    /// # Errors
    /// If the store cannot be read
    async fn len(&self) -> crate::Result<usize> {
        Ok(self.list().await?.len())
    }
}

#[async_trait]
impl<T: BackingStore + ?Sized> BackingStore for Arc<T> {
    async fn write(&self, message: &Message) -> crate::Result<SpooledMessageId> {
        (**self).write(message).await
    }

    async fn list(&self) -> crate::Result<Vec<SpooledMessageId>> {
        (**self).list().await
    }

    async fn read(&self, id: &SpooledMessageId) -> crate::Result<Message> {
        (**self).read(id).await
    }

    async fn claim(&self, id: &SpooledMessageId) -> crate::Result<Option<Message>> {
        (**self).claim(id).await
    }

    async fn release(&self, id: &SpooledMessageId, message: Message) -> crate::Result<()> {
        (**self).release(id, message).await
    }

    async fn complete(&self, id: &SpooledMessageId) -> crate::Result<()> {
        (**self).complete(id).await
    }

    async fn recover(&self, timeout: Duration) -> crate::Result<usize> {
        (**self).recover(timeout).await
    }

    async fn len(&self) -> crate::Result<usize> {
        (**self).len().await
    }
}
