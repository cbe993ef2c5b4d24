use async_trait::async_trait;
use mailspool_common::{Message, Transport, TransportError, outgoing};

/// Accepts every message and delivers none
///
/// Used when a mailer has no transport or delivery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        outgoing!(
            level = TRACE,
            "Discarding message \"{}\" (delivery disabled)",
            message.subject
        );
        Ok(1)
    }
}
