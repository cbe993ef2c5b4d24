pub mod config;
pub mod flushing;
pub mod kind;
pub mod mime;
pub mod null;
pub mod redirect;
pub mod sendmail;
pub mod smtp;
pub mod spool;

pub use config::{AuthMode, Encryption, SmtpSettings, TransportConfig};
pub use flushing::FlushingTransport;
pub use kind::TransportKind;
pub use null::NullTransport;
pub use redirect::RedirectingTransport;
pub use sendmail::SendmailTransport;
pub use smtp::SmtpTransport;
pub use spool::SpoolTransport;
