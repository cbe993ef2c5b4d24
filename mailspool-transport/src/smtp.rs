use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    transport::smtp::{
        self,
        authentication::{Credentials, Mechanism},
        extension::ClientId,
    },
};
use mailspool_common::{Message, Transport, TransportError, outgoing};

use crate::{
    config::{AuthMode, Encryption, SmtpSettings},
    mime,
};

type Connection = AsyncSmtpTransport<Tokio1Executor>;

/// SMTP delivery through lettre
///
/// The lettre transport (and its connection pool) is built on `start` and
/// dropped on `stop`, so a flush holds one connection for all its messages.
/// Sending while stopped starts the transport first.
#[derive(Debug)]
pub struct SmtpTransport {
    settings: SmtpSettings,
    connection: RwLock<Option<Connection>>,
}

impl SmtpTransport {
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self {
            settings,
            connection: RwLock::new(None),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn build(&self) -> Result<Connection, TransportError> {
        let settings = &self.settings;

        let mut builder = match settings.encryption {
            Some(Encryption::Ssl) => Connection::relay(&settings.host),
            Some(Encryption::Tls) => Connection::starttls_relay(&settings.host),
            None => Ok(Connection::builder_dangerous(&settings.host)),
        }
        .map_err(|e| TransportError::Connection(e.to_string()))?
        .port(settings.port)
        .timeout(Some(settings.timeout));

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        if let Some(mode) = settings.auth_mode {
            builder = builder.authentication(vec![match mode {
                AuthMode::Plain => Mechanism::Plain,
                AuthMode::Login => Mechanism::Login,
                AuthMode::Xoauth2 => Mechanism::Xoauth2,
            }]);
        }

        if let Some(domain) = &settings.local_domain {
            builder = builder.hello_name(ClientId::Domain(domain.clone()));
        }

        Ok(builder.build())
    }

    fn current(&self) -> Option<Connection> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn classify(error: &smtp::Error) -> TransportError {
    if error.is_permanent() {
        TransportError::Rejected(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn is_started(&self) -> bool {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn start(&self) -> Result<(), TransportError> {
        if self.is_started() {
            return Ok(());
        }

        let connection = self.build()?;
        match connection.test_connection().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(TransportError::Connection(format!(
                    "{}:{} did not accept the connection",
                    self.settings.host, self.settings.port
                )));
            }
            Err(e) => return Err(TransportError::Connection(e.to_string())),
        }

        outgoing!(
            level = DEBUG,
            "Connected to {}:{}",
            self.settings.host,
            self.settings.port
        );

        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection);

        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let connection = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if connection.is_some() {
            outgoing!(
                level = DEBUG,
                "Disconnected from {}:{}",
                self.settings.host,
                self.settings.port
            );
        }

        Ok(())
    }

    async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        let email = mime::to_lettre(message)?;

        let connection = match self.current() {
            Some(connection) => connection,
            None => {
                self.start().await?;
                self.current().ok_or_else(|| {
                    TransportError::Connection("transport stopped while sending".to_string())
                })?
            }
        };

        connection.send(email).await.map_err(|e| classify(&e))?;

        outgoing!(
            level = DEBUG,
            "Delivered message to {} via {}",
            message
                .recipients()
                .map(|m| m.address.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            self.settings.host
        );

        Ok(1)
    }
}
