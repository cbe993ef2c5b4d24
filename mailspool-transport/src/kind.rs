use std::sync::Arc;

use mailspool_common::Transport;
use mailspool_spool::SpoolKind;

use crate::FlushingTransport;

/// The transport a mailer sends through
#[derive(Debug, Clone)]
pub enum TransportKind {
    /// Messages are queued and flushed later (or instantly)
    Spool(Arc<FlushingTransport>),
    /// Messages go straight to a real transport
    Direct(Arc<dyn Transport>),
}

impl TransportKind {
    #[must_use]
    pub fn as_transport(&self) -> &dyn Transport {
        match self {
            Self::Spool(transport) => transport.as_ref(),
            Self::Direct(transport) => transport.as_ref(),
        }
    }

    /// The transport that actually delivers
    #[must_use]
    pub fn real_transport(&self) -> &dyn Transport {
        match self {
            Self::Spool(transport) => transport.real_transport(),
            Self::Direct(transport) => transport.as_ref(),
        }
    }

    #[must_use]
    pub fn spool(&self) -> Option<&SpoolKind> {
        match self {
            Self::Spool(transport) => Some(transport.spool()),
            Self::Direct(_) => None,
        }
    }
}
