use async_trait::async_trait;
use lettre::{AsyncSendmailTransport, AsyncTransport, Tokio1Executor};
use mailspool_common::{Message, Transport, TransportError, outgoing};

use crate::mime;

/// Delivery by piping to a local sendmail binary
#[derive(Debug, Clone, Default)]
pub struct SendmailTransport {
    command: Option<String>,
}

impl SendmailTransport {
    /// `command` replaces the default `sendmail` binary when set
    #[must_use]
    pub const fn new(command: Option<String>) -> Self {
        Self { command }
    }

    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

#[async_trait]
impl Transport for SendmailTransport {
    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        let email = mime::to_lettre(message)?;

        let sendmail = self.command.as_ref().map_or_else(
            AsyncSendmailTransport::<Tokio1Executor>::new,
            AsyncSendmailTransport::<Tokio1Executor>::new_with_command,
        );

        // A failing binary fails every message alike
        sendmail
            .send(email)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        outgoing!(level = DEBUG, "Handed message to sendmail");

        Ok(1)
    }
}
