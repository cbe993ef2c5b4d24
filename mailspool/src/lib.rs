//! Named mailers over spooling transports, end-of-work flushing and the
//! operator commands of the `mailspool` binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod mailer;
pub mod registry;
pub mod report;
pub mod trigger;

pub use config::{Config, ConfigError, FlushConfig, MailerConfig, ResolvedMailer};
pub use error::MailerError;
pub use mailer::{Mailer, MailerInfo};
pub use registry::MailerRegistry;
pub use trigger::{FlushOutcome, FlushTrigger, SkipReason, TerminateReport};
