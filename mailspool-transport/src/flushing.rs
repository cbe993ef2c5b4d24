use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use mailspool_common::{Message, Transport, TransportError, internal};
use mailspool_spool::{FlushOptions, FlushReport, SpoolError, SpoolKind};

use crate::spool::SpoolTransport;

/// A [`SpoolTransport`] paired with the real transport its spool drains into
///
/// With instant flush enabled every send is followed by a flush, so callers
/// get direct-send latency and failures while messages still take the spool
/// path.
#[derive(Debug)]
pub struct FlushingTransport {
    spool: SpoolTransport,
    real: Arc<dyn Transport>,
    options: FlushOptions,
    instant_flush: AtomicBool,
}

impl FlushingTransport {
    #[must_use]
    pub fn new(spool: SpoolTransport, real: Arc<dyn Transport>) -> Self {
        Self {
            spool,
            real,
            options: FlushOptions::default(),
            instant_flush: AtomicBool::new(false),
        }
    }

    /// Bounds applied to every flush this transport performs
    #[must_use]
    pub const fn with_options(mut self, options: FlushOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn spool(&self) -> &SpoolKind {
        self.spool.spool()
    }

    /// The transport the spool is flushed through
    #[must_use]
    pub fn real_transport(&self) -> &dyn Transport {
        self.real.as_ref()
    }

    #[must_use]
    pub fn is_instant_flush(&self) -> bool {
        self.instant_flush.load(Ordering::SeqCst)
    }

    /// Turn instant flush on and drain the current backlog
    ///
    /// # Errors
    /// If the backlog flush fails; the mode stays enabled regardless
    pub async fn enable_instant_flush(&self) -> Result<FlushReport, SpoolError> {
        self.instant_flush.store(true, Ordering::SeqCst);
        internal!(level = DEBUG, "Instant flush enabled");
        self.flush_spool().await
    }

    pub fn disable_instant_flush(&self) {
        self.instant_flush.store(false, Ordering::SeqCst);
        internal!(level = DEBUG, "Instant flush disabled");
    }

    /// Flush the spool through the real transport
    ///
    /// # Errors
    /// See [`SpoolKind::flush_queue`]
    pub async fn flush_spool(&self) -> Result<FlushReport, SpoolError> {
        self.flush_spool_with(&self.options).await
    }

    /// Flush the spool with bounds other than the configured ones
    ///
    /// # Errors
    /// See [`SpoolKind::flush_queue`]
    pub async fn flush_spool_with(&self, options: &FlushOptions) -> Result<FlushReport, SpoolError> {
        self.spool()
            .flush_queue(self.real.as_ref(), options)
            .await
    }
}

#[async_trait]
impl Transport for FlushingTransport {
    /// Under instant flush, fails only when this message itself was not
    /// delivered. Refusals of older queued messages are logged.
    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        let id = self.spool.enqueue(message).await?;

        if !self.is_instant_flush() {
            return Ok(1);
        }

        match self.flush_spool().await {
            Ok(report) => {
                if let Some(failed) = report.failed.iter().find(|failed| failed.id == id) {
                    return Err(TransportError::Rejected(failed.error.clone()));
                }

                if !report.failed.is_empty() {
                    internal!(
                        level = WARN,
                        "{} older spooled messages were refused and stay queued",
                        report.failed.len()
                    );
                }

                Ok(1)
            }
            Err(e) => {
                // The flush may have aborted after this message went out
                if self.spool().is_queued(&id).await.unwrap_or(true) {
                    return Err(match e {
                        SpoolError::Transport(e) => e,
                        e => TransportError::Storage(Box::new(e)),
                    });
                }

                internal!(
                    level = WARN,
                    "Flush aborted after delivering message {id}: {e}"
                );
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mailspool_common::{Mailbox, MockTransport, ScriptedFailure};
    use mailspool_spool::{MemoryBackingStore, Spool};

    use super::*;

    fn flushing(real: &MockTransport) -> FlushingTransport {
        let spool = SpoolKind::Memory(Spool::new(MemoryBackingStore::new()));
        FlushingTransport::new(SpoolTransport::new(spool), Arc::new(real.clone()))
    }

    fn message(to: &str) -> Message {
        Message::builder().to(Mailbox::new(to)).build()
    }

    #[tokio::test]
    async fn test_send_without_instant_flush_only_queues() {
        let real = MockTransport::new();
        let transport = flushing(&real);

        assert_eq!(transport.send(&message("a@x.com")).await.expect("send"), 1);
        assert_eq!(real.attempts(), 0);
        assert_eq!(transport.spool().len().await.expect("len"), 1);
    }

    #[tokio::test]
    async fn test_send_with_instant_flush_delivers() {
        let real = MockTransport::new();
        let transport = flushing(&real);
        transport.enable_instant_flush().await.expect("enable");

        transport.send(&message("a@x.com")).await.expect("send");
        transport.send(&message("b@y.com")).await.expect("send");

        assert_eq!(real.sent_to(), ["a@x.com", "b@y.com"]);
        assert_eq!(transport.spool().len().await.expect("len"), 0);
        assert_eq!((real.starts(), real.stops()), (2, 2));
    }

    #[tokio::test]
    async fn test_instant_flush_surfaces_rejection() {
        let real = MockTransport::new();
        real.fail_on(1, ScriptedFailure::Rejected);
        let transport = flushing(&real);
        transport.enable_instant_flush().await.expect("enable");

        let result = transport.send(&message("a@x.com")).await;
        assert!(matches!(result, Err(TransportError::Rejected(_))));
        assert_eq!(transport.spool().len().await.expect("len"), 1);
    }

    #[tokio::test]
    async fn test_instant_flush_ignores_refused_backlog() {
        let real = MockTransport::new();
        real.fail_on(1, ScriptedFailure::Rejected);
        real.fail_on(2, ScriptedFailure::Rejected);
        let transport = flushing(&real);
        transport.enable_instant_flush().await.expect("enable");

        let first = transport.send(&message("a@x.com")).await;
        assert!(matches!(first, Err(TransportError::Rejected(_))));

        // a@x.com is refused again, b@y.com goes through
        assert_eq!(transport.send(&message("b@y.com")).await.expect("send"), 1);
        assert_eq!(real.sent_to(), ["b@y.com"]);
        assert_eq!(transport.spool().len().await.expect("len"), 1);
    }

    #[tokio::test]
    async fn test_instant_flush_fails_when_aborted_before_message() {
        let real = MockTransport::new();
        real.fail_on(1, ScriptedFailure::Connection);
        real.fail_on(2, ScriptedFailure::Connection);
        let transport = flushing(&real);
        transport.send(&message("a@x.com")).await.expect("queue");
        assert!(transport.enable_instant_flush().await.is_err());
        assert!(transport.is_instant_flush());

        let result = transport.send(&message("b@y.com")).await;

        assert!(matches!(result, Err(TransportError::Connection(_))));
        assert_eq!(real.attempts(), 2);
        assert_eq!(transport.spool().len().await.expect("len"), 2);
    }

    #[tokio::test]
    async fn test_instant_flush_surfaces_connection_failure() {
        let real = MockTransport::new();
        real.fail_on(1, ScriptedFailure::Connection);
        let transport = flushing(&real);
        transport.enable_instant_flush().await.expect("enable");

        let result = transport.send(&message("a@x.com")).await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }
}
