//! Conversion of a spooled [`Message`] into a lettre message.

use std::time::SystemTime;

use lettre::message::{Mailbox as LettreMailbox, header::ContentType};
use mailspool_common::{Mailbox, Message, TransportError};

fn mailbox(mailbox: &Mailbox) -> Result<LettreMailbox, TransportError> {
    let address = mailbox.address.parse().map_err(|e| {
        TransportError::InvalidMessage(format!("invalid address {}: {e}", mailbox.address))
    })?;

    Ok(LettreMailbox::new(mailbox.name.clone(), address))
}

/// Build a lettre message carrying the same envelope, headers and body
///
/// # Errors
/// If an address, the content type or the message as a whole is invalid
pub fn to_lettre(message: &Message) -> Result<lettre::Message, TransportError> {
    let mut builder = lettre::Message::builder()
        .subject(message.subject.as_str())
        .date(SystemTime::from(message.date));

    for from in &message.from {
        builder = builder.from(mailbox(from)?);
    }
    for to in &message.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &message.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }

    let content_type = ContentType::parse(&format!(
        "{}; charset={}",
        message.content_type, message.charset
    ))
    .map_err(|e| {
        TransportError::InvalidMessage(format!(
            "invalid content type {}: {e}",
            message.content_type
        ))
    })?;

    builder
        .header(content_type)
        .body(message.body.clone())
        .map_err(|e| TransportError::InvalidMessage(e.to_string()))
}
