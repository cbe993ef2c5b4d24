use std::io::Write;

use anyhow::{anyhow, bail};
use mailspool_common::{Mailbox, Message};
use mailspool_transport::TransportKind;

use super::selected;
use crate::MailerRegistry;

/// Options of `mailspool test`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEmail {
    /// Destination address
    pub email: Option<String>,
    pub from: String,
    pub subject: String,
    pub mailer: Option<String>,
    /// Flush the spool once the message is queued
    pub flush: bool,
}

impl Default for TestEmail {
    fn default() -> Self {
        Self {
            email: None,
            from: "noreply@example.com".to_string(),
            subject: "Mailspool Test Email".to_string(),
            mailer: None,
            flush: false,
        }
    }
}

/// Send a generated message through each selected mailer
///
/// # Errors
/// If an address is missing or invalid, a mailer cannot deliver at all
/// (null transport without spool), sending fails, or `out` cannot be written
pub async fn test_email(
    registry: &MailerRegistry,
    options: &TestEmail,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let to = options
        .email
        .as_deref()
        .ok_or_else(|| anyhow!("You have to provide a destination email address."))?;
    let to = Mailbox::parse(to)
        .map_err(|e| anyhow!("You have to provide a valid destination email address: {e}"))?;
    let from = Mailbox::parse(&options.from)
        .map_err(|e| anyhow!("You have to provide a valid sender email address: {e}"))?;

    for name in selected(registry, options.mailer.as_deref())? {
        let info = registry.info(&name)?;
        if !info.spool_enabled && (info.transport_name == "null" || !info.delivery_enabled) {
            bail!(
                "Unable to send the test email: the {name} mailer transport is currently a null transport."
            );
        }

        writeln!(out, "Testing {name} mailer... ")?;
        match &info.single_address {
            Some(single) => writeln!(
                out,
                "The test email will be sent to {} (really sent to {single}).",
                to.address
            )?,
            None => writeln!(out, "The test email will be sent to {}.", to.address)?,
        }

        let sent_at = chrono::Local::now().format("%A %Y-%m-%d %H:%M:%S").to_string();
        let message = Message::builder()
            .subject(options.subject.clone())
            .from(from.clone())
            .to(to.clone())
            .body(format!(
                "This email has been auto generated by mailspool and sent on {sent_at} by {name} mailer"
            ))
            .content_type("text/plain")
            .build();

        let mailer = registry.mailer(&name).await?;
        if mailer.send(&message).await? == 0 {
            bail!("Unable to send the test email: please check the {name} mailer configuration");
        }
        writeln!(out, "The test email has been sent on {sent_at}")?;

        if options.flush
            && let TransportKind::Spool(transport) = mailer.transport()
        {
            writeln!(out, "flushing {name} spool queue...")?;
            let report = transport.flush_spool().await?;
            let plural = if report.sent > 1 { "s" } else { "" };
            writeln!(
                out,
                "{} email{plural} sent by flushing the {name} mailer spool.",
                report.sent
            )?;
        }
    }

    Ok(())
}
