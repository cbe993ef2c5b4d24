use std::sync::Arc;

use async_trait::async_trait;
use mailspool_common::{Mailbox, Message, Transport, TransportError};

/// Sends every message to a fixed set of addresses instead of its recipients
#[derive(Debug)]
pub struct RedirectingTransport {
    inner: Arc<dyn Transport>,
    addresses: Vec<Mailbox>,
}

impl RedirectingTransport {
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>, addresses: Vec<Mailbox>) -> Self {
        Self { inner, addresses }
    }

    #[must_use]
    pub fn addresses(&self) -> &[Mailbox] {
        &self.addresses
    }
}

#[async_trait]
impl Transport for RedirectingTransport {
    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.inner.start().await
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.inner.stop().await
    }

    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        let mut redirected = message.clone();
        redirected.to.clone_from(&self.addresses);
        redirected.cc.clear();
        redirected.bcc.clear();

        self.inner.send(&redirected).await
    }
}
