use async_trait::async_trait;
use mailspool_common::{Message, Transport, TransportError};
use mailspool_spool::{SpoolKind, SpooledMessageId};

/// Transport that queues instead of sending
///
/// Acceptance into the spool counts as sent: `send` reports one message
/// whatever happens to it when the spool is flushed later.
#[derive(Debug, Clone)]
pub struct SpoolTransport {
    spool: SpoolKind,
}

impl SpoolTransport {
    #[must_use]
    pub const fn new(spool: SpoolKind) -> Self {
        Self { spool }
    }

    /// The spool messages are queued in
    #[must_use]
    pub const fn spool(&self) -> &SpoolKind {
        &self.spool
    }

    /// Queue `message`, returning its id
    ///
    /// # Errors
    /// [`TransportError::Storage`] if the spool cannot hold the message
    pub async fn enqueue(&self, message: &Message) -> Result<SpooledMessageId, TransportError> {
        self.spool
            .enqueue(message)
            .await
            .map_err(|e| TransportError::Storage(Box::new(e)))
    }
}

#[async_trait]
impl Transport for SpoolTransport {
    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        self.enqueue(message).await?;
        Ok(1)
    }
}
