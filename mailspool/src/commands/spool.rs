use std::{io::Write, time::Duration};

use mailspool_common::internal;
use mailspool_spool::{FlushOptions, SpoolKind};
use mailspool_transport::TransportKind;

use super::{now, selected};
use crate::{MailerRegistry, report};

/// Options of `mailspool spool debug`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolDebug {
    pub mailer: Option<String>,
    /// 0 shows every message
    pub max_messages: usize,
    /// 0 shows every recipient
    pub max_recipients: usize,
}

impl Default for SpoolDebug {
    fn default() -> Self {
        Self {
            mailer: None,
            max_messages: 10,
            max_recipients: 5,
        }
    }
}

/// Show the messages waiting in file spools
///
/// Only file spools can be inspected; other spooling mailers are reported
/// as skipped without being built.
///
/// # Errors
/// If the named mailer does not exist, a spool cannot be read, or `out`
/// cannot be written
pub async fn debug_spool(
    registry: &MailerRegistry,
    options: &SpoolDebug,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for name in selected(registry, options.mailer.as_deref())? {
        let info = registry.info(&name)?;
        write!(out, "[{}] Processing {name} mailer... ", now())?;

        match info.spool_kind {
            None => writeln!(out, "No email to dump as the spool is disabled.")?,
            Some("file") => {
                let mailer = registry.mailer(&name).await?;
                let Some(SpoolKind::File(spool)) = mailer.spool() else {
                    writeln!(out, "No email to dump as the spool is disabled.")?;
                    continue;
                };

                let inspection = spool.store().inspect(options.max_messages).await?;
                let rendered = report::spool(&name, &inspection, options.max_recipients);
                out.write_all(rendered.as_bytes())?;
            }
            Some(kind) => writeln!(
                out,
                "Skipping mailer {name} which uses \"{kind}\" spool (only file spools are supported)"
            )?,
        }
    }

    Ok(())
}

/// Options of `mailspool spool send`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpoolSend {
    pub mailer: Option<String>,
    /// Overrides the configured limit
    pub message_limit: Option<usize>,
    /// Overrides the configured limit
    pub time_limit: Option<Duration>,
    /// Claims older than this are returned to file spools before flushing
    pub recover_timeout: Duration,
}

/// Flush spools through their real transports now
///
/// # Errors
/// If the named mailer does not exist or cannot be built, a flush fails, or
/// `out` cannot be written
pub async fn send_spool(
    registry: &MailerRegistry,
    options: &SpoolSend,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut flush: FlushOptions = *registry.flush_options();
    if options.message_limit.is_some() {
        flush.message_limit = options.message_limit;
    }
    if options.time_limit.is_some() {
        flush.time_limit = options.time_limit;
    }

    for name in selected(registry, options.mailer.as_deref())? {
        write!(out, "[{}] Processing {name} mailer... ", now())?;

        let mailer = registry.mailer(&name).await?;
        let TransportKind::Spool(transport) = mailer.transport() else {
            writeln!(out, "No email to send as the spool is disabled.")?;
            continue;
        };

        if let SpoolKind::File(spool) = transport.spool() {
            let recovered = spool.recover(options.recover_timeout).await?;
            if recovered > 0 {
                internal!(
                    level = WARN,
                    "Returned {recovered} abandoned messages to the {name} spool"
                );
            }
        }

        let report = transport.flush_spool_with(&flush).await?;
        write!(out, "{} emails sent", report.sent)?;
        if !report.failed.is_empty() {
            write!(out, " ({} refused and kept in the spool)", report.failed.len())?;
        }
        writeln!(out)?;
    }

    Ok(())
}
