//! Operator commands. Each writes its report to `out` and returns an error
//! for anything that should end the process with a failure status.

mod debug;
mod new_email;
mod spool;
mod test_email;

pub use debug::debug;
pub use new_email::{NewEmail, new_email};
pub use spool::{SpoolDebug, SpoolSend, debug_spool, send_spool};
pub use test_email::{TestEmail, test_email};

use crate::{MailerRegistry, error::MailerError};

/// The mailer named on the command line, or every mailer
fn selected(registry: &MailerRegistry, name: Option<&str>) -> Result<Vec<String>, MailerError> {
    match name {
        Some(name) if !registry.contains(name) => Err(MailerError::NotFound(name.to_string())),
        Some(name) => Ok(vec![name.to_string()]),
        None => Ok(registry.names().map(ToString::to_string).collect()),
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
