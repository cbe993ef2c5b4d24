//! The transport capability.
//!
//! A transport either delivers a message for real (SMTP, sendmail) or, in the
//! case of the spool transport, accepts it for later delivery. Everything that
//! moves messages out of a spool only ever talks to this trait.

use std::{
    collections::HashMap,
    error::Error,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Message;

/// Failures reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection to the remote side could not be established or was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The remote side refused this particular message.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The message could not be turned into something the transport can send.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The spool backing a spool transport could not store the message.
    #[error("Spool storage failure: {0}")]
    Storage(#[source] Box<dyn Error + Send + Sync>),
}

impl TransportError {
    /// Returns `true` if the failure concerns the connection rather than a
    /// single message, meaning further sends on it will fail too.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Something that can send messages.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Whether the underlying resource (connection, process) is ready.
    ///
    /// Stateless transports are always started.
    fn is_started(&self) -> bool {
        true
    }

    /// Acquire the underlying resource.
    ///
    /// # Errors
    /// If the resource cannot be acquired
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Release the underlying resource.
    ///
    /// # Errors
    /// If releasing fails; the resource is considered released regardless
    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Send a message, returning how many messages were accepted.
    ///
    /// # Errors
    /// If the message was not accepted
    async fn send(&self, message: &Message) -> Result<usize, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_started(&self) -> bool {
        (**self).is_started()
    }

    async fn start(&self) -> Result<(), TransportError> {
        (**self).start().await
    }

    async fn stop(&self) -> Result<(), TransportError> {
        (**self).stop().await
    }

    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        (**self).send(message).await
    }
}

/// Failure a [`MockTransport`] can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    Connection,
    Rejected,
}

impl ScriptedFailure {
    fn into_error(self, attempt: usize) -> TransportError {
        match self {
            Self::Connection => {
                TransportError::Connection(format!("scripted connection failure on send {attempt}"))
            }
            Self::Rejected => {
                TransportError::Rejected(format!("scripted rejection on send {attempt}"))
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    sent: Mutex<Vec<Message>>,
    script: Mutex<HashMap<usize, ScriptedFailure>>,
    attempts: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    started: AtomicBool,
    refuse_start: AtomicBool,
}

/// Mock implementation of [`Transport`] for testing
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Create a new, stopped mock transport that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `attempt`-th send (1-based, counted across the transport's lifetime)
    pub fn fail_on(&self, attempt: usize, failure: ScriptedFailure) {
        self.state
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(attempt, failure);
    }

    /// Make every subsequent `start` fail with a connection error
    pub fn refuse_start(&self) {
        self.state.refuse_start.store(true, Ordering::SeqCst);
    }

    /// Get all successfully sent messages, in order
    pub fn sent(&self) -> Vec<Message> {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First `to` address of every sent message, in order
    pub fn sent_to(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| m.to.first().map(|mb| mb.address.clone()))
            .collect()
    }

    /// Number of `send` calls, successful or not
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Number of `start` calls
    pub fn starts(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    pub fn stops(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_started(&self) -> bool {
        self.state.started.load(Ordering::SeqCst)
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        if self.state.refuse_start.load(Ordering::SeqCst) {
            return Err(TransportError::Connection(
                "scripted start failure".to_string(),
            ));
        }
        self.state.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        self.state.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        let attempt = self.state.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let scripted = self
            .state
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&attempt)
            .copied();

        if let Some(failure) = scripted {
            return Err(failure.into_error(attempt));
        }

        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_scripted_failure() {
        let transport = MockTransport::new();
        transport.fail_on(2, ScriptedFailure::Rejected);

        let message = Message::default();
        assert_eq!(transport.send(&message).await.ok(), Some(1));

        let err = transport.send(&message).await.unwrap_err();
        assert!(!err.is_connection_failure());
        assert!(matches!(err, TransportError::Rejected(_)));

        assert_eq!(transport.send(&message).await.ok(), Some(1));
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_start_stop_tracking() {
        let transport = MockTransport::new();
        assert!(!transport.is_started());

        transport.start().await.expect("start");
        assert!(transport.is_started());

        transport.stop().await.expect("stop");
        assert!(!transport.is_started());
        assert_eq!((transport.starts(), transport.stops()), (1, 1));
    }

    #[tokio::test]
    async fn test_mock_transport_survives_poisoned_lock() {
        let transport = MockTransport::new();
        transport.send(&Message::default()).await.expect("send");

        let state = Arc::clone(&transport.state);
        let _ = std::thread::spawn(move || {
            let _guard = state.sent.lock();
            panic!("poison the sent list");
        })
        .join();
        assert!(transport.state.sent.is_poisoned());

        transport.fail_on(3, ScriptedFailure::Rejected);
        assert_eq!(transport.send(&Message::default()).await.ok(), Some(1));
        assert!(transport.send(&Message::default()).await.is_err());
        assert_eq!(transport.sent().len(), 2);
    }
}
