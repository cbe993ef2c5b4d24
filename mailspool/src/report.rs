//! Plain-text reports for operators.

use std::fmt::Write;

use mailspool_common::{Mailbox, Message};
use mailspool_spool::SpoolInspection;

use crate::mailer::MailerInfo;

/// Shown in place of a missing sender or recipient
pub const EMPTY: &str = "<EMPTY>";

const SENT_AT_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

fn yes_no(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::new();
    for (cell, &width) in cells.zip(widths) {
        let _ = write!(line, "{cell:<width$}  ");
    }
    line.trim_end().to_string()
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", table_line(headers.iter().copied(), &widths));
    let rule = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(rule));
    for row in rows {
        let _ = writeln!(out, "{}", table_line(row.iter().map(String::as_str), &widths));
    }

    out
}

/// One row per mailer: name, transport, spool, delivery, single address
pub fn mailers<'a>(infos: impl IntoIterator<Item = &'a MailerInfo>) -> String {
    let rows: Vec<Vec<String>> = infos
        .into_iter()
        .map(|info| {
            let name = if info.is_default {
                format!("{} (default mailer)", info.name)
            } else {
                info.name.clone()
            };

            vec![
                name,
                info.transport_name.clone(),
                yes_no(info.spool_enabled).to_string(),
                yes_no(info.delivery_enabled).to_string(),
                info.single_address.clone().unwrap_or_default(),
            ]
        })
        .collect();

    render_table(
        &["Name", "Transport", "Spool", "Delivery", "Single Address"],
        &rows,
    )
}

fn format_mailbox(mailbox: Option<&Mailbox>) -> String {
    mailbox.map_or_else(|| EMPTY.to_string(), ToString::to_string)
}

fn continuation(recipient: String) -> Vec<String> {
    vec![recipient, String::new(), String::new(), String::new(), String::new()]
}

/// Rows for one message; returns how many recipients were left out
fn message_rows(
    mailer: &str,
    message: &Message,
    max_recipients: usize,
    rows: &mut Vec<Vec<String>>,
) -> usize {
    let shown = if max_recipients == 0 {
        message.to.len()
    } else {
        message.to.len().min(max_recipients)
    };
    let truncated = message.to.len() - shown;

    rows.push(vec![
        format_mailbox(message.to.first()),
        format_mailbox(message.sender()),
        message.subject.clone(),
        mailer.to_string(),
        message.date.format(SENT_AT_FORMAT).to_string(),
    ]);

    if message.to.len() > 1 {
        for recipient in &message.to[1..shown] {
            rows.push(continuation(recipient.to_string()));
        }
        if truncated > 0 {
            rows.push(continuation(format!("+{truncated} more")));
        }
    }

    truncated
}

/// The queued messages of a file spool, with totals
///
/// `max_recipients` limits the recipients listed per message (0 = all).
pub fn spool(mailer: &str, inspection: &SpoolInspection, max_recipients: usize) -> String {
    if inspection.total == 0 {
        return "No email to dump as the spool is empty.\n".to_string();
    }

    let mut rows = Vec::new();
    let mut truncated = 0;
    for (_, message) in &inspection.entries {
        truncated += message_rows(mailer, message, max_recipients, &mut rows);
    }

    let mut out = String::from("\n");
    if !rows.is_empty() {
        out.push_str(&render_table(
            &["To", "From", "Subject", "Mailer", "Sent at"],
            &rows,
        ));
    }

    let _ = writeln!(out, "{} emails total in spool", inspection.total);

    let not_displayed = inspection.not_displayed();
    if not_displayed > 0 {
        let _ = writeln!(
            out,
            "{not_displayed} emails not displayed here, use --max-messages option to show them"
        );
    }

    if truncated > 0 {
        let _ = writeln!(
            out,
            "{truncated} recipients not displayed here, use --max-recipients option to show them"
        );
    }

    if inspection.unreadable > 0 {
        let _ = writeln!(
            out,
            "{} emails could not be read and are not displayed",
            inspection.unreadable
        );
    }

    out
}
