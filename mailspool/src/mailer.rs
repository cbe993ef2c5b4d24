use std::sync::Arc;

use mailspool_common::{Mailbox, Message, Transport, TransportError, internal};
use mailspool_spool::{FlushOptions, SpoolKind, SpoolServices};
use mailspool_transport::{FlushingTransport, RedirectingTransport, SpoolTransport, TransportKind};

use crate::{config::ResolvedMailer, error::MailerError};

/// What operators are told about a mailer, available without building it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerInfo {
    pub name: String,
    pub transport_name: String,
    pub spool_enabled: bool,
    /// `file`, `memory` or `service` when spooling
    pub spool_kind: Option<&'static str>,
    pub delivery_enabled: bool,
    pub single_address: Option<String>,
    pub is_default: bool,
}

impl MailerInfo {
    pub(crate) fn new(resolved: &ResolvedMailer, is_default: bool) -> Self {
        Self {
            name: resolved.name.clone(),
            transport_name: resolved.transport_name.clone(),
            spool_enabled: resolved.spool.is_some(),
            spool_kind: resolved.spool.as_ref().map(|spool| spool.kind_name()),
            delivery_enabled: resolved.delivery_enabled,
            single_address: resolved.single_address().map(|m| m.address.clone()),
            is_default,
        }
    }
}

/// A named, ready to use transport (possibly spooling)
#[derive(Debug)]
pub struct Mailer {
    info: MailerInfo,
    transport: TransportKind,
    sender: Option<Mailbox>,
}

impl Mailer {
    /// Build the transports and open the spool of a mailer
    ///
    /// `real` replaces the configured delivery transport. It is ignored when
    /// delivery is disabled, and still redirected to the configured delivery
    /// addresses.
    ///
    /// With instant flush configured the backlog is flushed once here. A failed
    /// backlog flush is only logged; the mode stays on and the records stay
    /// queued.
    ///
    /// # Errors
    /// If the spool cannot be opened
    pub async fn build(
        resolved: &ResolvedMailer,
        info: MailerInfo,
        services: &SpoolServices,
        real: Option<Arc<dyn Transport>>,
        flush: FlushOptions,
    ) -> Result<Self, MailerError> {
        let real: Arc<dyn Transport> = match real {
            Some(real) if resolved.delivery_enabled => {
                if resolved.delivery_addresses.is_empty() {
                    real
                } else {
                    Arc::new(RedirectingTransport::new(
                        real,
                        resolved.delivery_addresses.clone(),
                    ))
                }
            }
            _ => resolved.transport.build(&resolved.delivery_addresses),
        };

        let transport = match &resolved.spool {
            Some(spool) => {
                let spool = spool.clone().into_spool(&resolved.name, services)?;
                let flushing =
                    FlushingTransport::new(SpoolTransport::new(spool), real).with_options(flush);

                if resolved.instant_flush
                    && let Err(e) = flushing.enable_instant_flush().await
                {
                    internal!(
                        level = WARN,
                        "Initial flush of mailer {} failed, backlog stays queued: {e}",
                        resolved.name
                    );
                }

                TransportKind::Spool(Arc::new(flushing))
            }
            None => TransportKind::Direct(real),
        };

        internal!(
            level = DEBUG,
            "Instantiated mailer {} ({} transport, spool {})",
            info.name,
            info.transport_name,
            info.spool_kind.unwrap_or("disabled")
        );

        Ok(Self {
            info,
            transport,
            sender: resolved.sender.clone(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub const fn info(&self) -> &MailerInfo {
        &self.info
    }

    #[must_use]
    pub const fn transport(&self) -> &TransportKind {
        &self.transport
    }

    #[must_use]
    pub fn spool(&self) -> Option<&SpoolKind> {
        self.transport.spool()
    }

    /// The transport that actually delivers, bypassing any spool
    #[must_use]
    pub fn real_transport(&self) -> &dyn Transport {
        self.transport.real_transport()
    }

    /// Send (or queue) a message
    ///
    /// The configured sender address is used when the message has none.
    ///
    /// # Errors
    /// If the transport refuses the message
    pub async fn send(&self, message: &Message) -> Result<usize, TransportError> {
        match &self.sender {
            Some(sender) if message.from.is_empty() => {
                let mut message = message.clone();
                message.from.push(sender.clone());
                self.transport.as_transport().send(&message).await
            }
            _ => self.transport.as_transport().send(message).await,
        }
    }
}
