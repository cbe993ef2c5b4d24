use std::io::Write;

use mailspool_common::{Mailbox, Message};

use crate::MailerRegistry;

/// Options of `mailspool email new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmail {
    pub from: String,
    /// Comma separated recipients
    pub to: String,
    pub subject: String,
    pub body: String,
    pub content_type: String,
    pub charset: String,
    /// Defaults to the default mailer
    pub mailer: Option<String>,
}

/// Compose a simple message and send it through a mailer's transport
///
/// The transport is started before and stopped after the send, so a spooling
/// mailer queues the message and a direct one delivers it immediately.
///
/// # Errors
/// If an address is invalid, the mailer does not exist, the transport fails,
/// or `out` cannot be written
pub async fn new_email(
    registry: &MailerRegistry,
    options: &NewEmail,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut builder = Message::builder()
        .from(Mailbox::parse(&options.from)?)
        .subject(options.subject.clone())
        .body(options.body.clone())
        .content_type(options.content_type.clone())
        .charset(options.charset.clone());
    for recipient in Mailbox::parse_list(&options.to)? {
        builder = builder.to(recipient);
    }
    let message = builder.build();

    let mailer = match options.mailer.as_deref() {
        Some(name) => registry.mailer(name).await?,
        None => registry.default_mailer().await?,
    };

    let transport = mailer.transport().as_transport();
    transport.start().await?;
    let sent = mailer.send(&message).await;
    transport.stop().await?;

    writeln!(out, "Sent {} emails", sent?)?;
    Ok(())
}
