use mailspool_common::TransportError;
use mailspool_spool::SpoolError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("The mailer \"{0}\" does not exist.")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spool(#[from] SpoolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
