#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use mailspool::{
    Config, MailerRegistry,
    commands::{self, NewEmail, SpoolDebug, SpoolSend, TestEmail},
};
use mailspool_common::{Mailbox, Message, MockTransport};

fn registry(config: &str) -> MailerRegistry {
    let config: Config = config.parse().expect("valid config");
    MailerRegistry::from_config(&config).expect("valid registry")
}

fn file_registry(dir: &tempfile::TempDir) -> MailerRegistry {
    registry(&format!(
        r#"(mailers: {{ "default": (transport: None, spool: Some(File(path: "{}"))) }})"#,
        dir.path().display()
    ))
}

fn output(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("utf-8 output")
}

async fn queue(registry: &MailerRegistry, messages: impl IntoIterator<Item = Message>) {
    let mailer = registry.default_mailer().await.unwrap();
    for message in messages {
        mailer.send(&message).await.unwrap();
    }
}

fn message(subject: &str, recipients: &[&str]) -> Message {
    let mut builder = Message::builder()
        .from(Mailbox::new("app@example.com"))
        .subject(subject);
    for to in recipients {
        builder = builder.to(Mailbox::new(*to));
    }
    builder.build()
}

#[test]
fn test_debug_lists_mailers() {
    let registry = registry(
        r#"(mailers: {
            "default": (transport: Some("sendmail"), spool: Some(Memory(capacity: None))),
            "qa": (transport: None, delivery_addresses: ["qa@example.com"], disable_delivery: true),
        })"#,
    );
    let mut out = Vec::new();

    commands::debug(&registry, None, &mut out).unwrap();
    let out = output(out);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[2].starts_with("default (default mailer)  sendmail"));
    assert!(lines[3].starts_with("qa "));
    assert!(lines[3].ends_with("qa@example.com"));
}

#[test]
fn test_debug_unknown_mailer() {
    let registry = registry(r#"(mailers: { "default": (transport: None) })"#);
    let mut out = Vec::new();

    let err = commands::debug(&registry, Some("nope"), &mut out).unwrap_err();

    assert_eq!(err.to_string(), "The mailer \"nope\" does not exist.");
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_spool_debug_limits_messages() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(&dir);
    queue(
        &registry,
        (0..12).map(|i| message(&format!("message {i}"), &[format!("user{i}@example.com").as_str()])),
    )
    .await;

    let options = SpoolDebug {
        mailer: Some("default".to_string()),
        max_messages: 5,
        ..SpoolDebug::default()
    };
    let mut out = Vec::new();
    commands::debug_spool(&registry, &options, &mut out).await.unwrap();
    let out = output(out);

    let rows = out.lines().filter(|line| line.contains("message ")).count();
    assert_eq!(rows, 5);
    assert!(out.contains("12 emails total in spool\n"));
    assert!(out.contains("7 emails not displayed here, use --max-messages option to show them\n"));
    assert!(out.contains("message 0"));
    assert!(!out.contains("message 5"));
}

#[tokio::test]
async fn test_spool_debug_truncates_recipients() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(&dir);
    queue(
        &registry,
        [message(
            "crowded",
            &["one@example.com", "two@example.com", "three@example.com", "four@example.com"],
        )],
    )
    .await;

    let options = SpoolDebug {
        max_recipients: 2,
        ..SpoolDebug::default()
    };
    let mut out = Vec::new();
    commands::debug_spool(&registry, &options, &mut out).await.unwrap();
    let out = output(out);

    let lines: Vec<&str> = out.lines().collect();
    let first = lines
        .iter()
        .position(|line| line.starts_with("one@example.com"))
        .expect("primary row");

    assert!(lines[first].contains("app@example.com"));
    assert!(lines[first].contains("crowded"));
    assert_eq!(lines[first + 1], "two@example.com");
    assert_eq!(lines[first + 2], "+2 more");
    assert!(!out.contains("three@example.com"));
    assert!(out.contains("2 recipients not displayed here, use --max-recipients option to show them\n"));
}

#[tokio::test]
async fn test_spool_debug_empty_spool() {
    let dir = tempfile::tempdir().unwrap();
    let registry = file_registry(&dir);
    let mut out = Vec::new();

    commands::debug_spool(&registry, &SpoolDebug::default(), &mut out)
        .await
        .unwrap();

    assert!(output(out).ends_with("Processing default mailer... No email to dump as the spool is empty.\n"));
}

#[tokio::test]
async fn test_spool_debug_skips_other_spools() {
    let registry = registry(
        r#"(mailers: {
            "default": (transport: None, spool: Some(Memory(capacity: None))),
            "direct": (transport: None),
        })"#,
    );
    let mut out = Vec::new();

    commands::debug_spool(&registry, &SpoolDebug::default(), &mut out)
        .await
        .unwrap();
    let out = output(out);

    assert!(out.contains(
        "Skipping mailer default which uses \"memory\" spool (only file spools are supported)\n"
    ));
    assert!(out.contains("Processing direct mailer... No email to dump as the spool is disabled.\n"));
    assert!(!registry.is_instantiated("default"));
}

#[tokio::test]
async fn test_spool_debug_unknown_mailer() {
    let registry = registry(r#"(mailers: { "default": (transport: None) })"#);
    let options = SpoolDebug {
        mailer: Some("missing".to_string()),
        ..SpoolDebug::default()
    };

    let err = commands::debug_spool(&registry, &options, &mut Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "The mailer \"missing\" does not exist.");
}

#[tokio::test]
async fn test_spool_send_flushes_file_spool() {
    let dir = tempfile::tempdir().unwrap();
    let transport = MockTransport::new();
    let registry = file_registry(&dir).with_transport("default", Arc::new(transport.clone()));
    queue(
        &registry,
        ["a@x.com", "b@y.com", "c@z.com"].map(|to| message("queued", &[to])),
    )
    .await;

    let options = SpoolSend {
        recover_timeout: Duration::from_secs(900),
        ..SpoolSend::default()
    };
    let mut out = Vec::new();
    commands::send_spool(&registry, &options, &mut out).await.unwrap();

    assert!(output(out).ends_with("3 emails sent\n"));
    assert_eq!(transport.sent_to(), ["a@x.com", "b@y.com", "c@z.com"]);
    let spool = registry.default_mailer().await.unwrap();
    assert_eq!(spool.spool().unwrap().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_spool_send_honours_message_limit() {
    let dir = tempfile::tempdir().unwrap();
    let transport = MockTransport::new();
    let registry = file_registry(&dir).with_transport("default", Arc::new(transport.clone()));
    queue(
        &registry,
        ["a@x.com", "b@y.com", "c@z.com"].map(|to| message("queued", &[to])),
    )
    .await;

    let options = SpoolSend {
        message_limit: Some(2),
        ..SpoolSend::default()
    };
    let mut out = Vec::new();
    commands::send_spool(&registry, &options, &mut out).await.unwrap();

    assert!(output(out).ends_with("2 emails sent\n"));
    let mailer = registry.default_mailer().await.unwrap();
    assert_eq!(mailer.spool().unwrap().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_test_email_refuses_null_transport() {
    let registry = registry(r#"(mailers: { "default": (transport: None) })"#);
    let options = TestEmail {
        email: Some("me@example.com".to_string()),
        ..TestEmail::default()
    };

    let err = commands::test_email(&registry, &options, &mut Vec::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("null transport"));
}

#[tokio::test]
async fn test_test_email_requires_valid_address() {
    let registry = registry(r#"(mailers: { "default": (transport: None) })"#);

    let missing = commands::test_email(&registry, &TestEmail::default(), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(
        missing.to_string(),
        "You have to provide a destination email address."
    );

    let options = TestEmail {
        email: Some("not an address".to_string()),
        ..TestEmail::default()
    };
    let invalid = commands::test_email(&registry, &options, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(invalid.to_string().starts_with("You have to provide a valid destination email address"));
}

#[tokio::test]
async fn test_test_email_with_flush_and_single_address() {
    let transport = MockTransport::new();
    let registry = registry(
        r#"(mailers: {
            "default": (
                transport: Some("sendmail"),
                spool: Some(Memory(capacity: None)),
                delivery_addresses: ["qa@example.com"],
            ),
        })"#,
    )
    .with_transport("default", Arc::new(transport.clone()));
    let options = TestEmail {
        email: Some("me@example.com".to_string()),
        flush: true,
        ..TestEmail::default()
    };
    let mut out = Vec::new();

    commands::test_email(&registry, &options, &mut out).await.unwrap();
    let out = output(out);

    assert!(out.starts_with("Testing default mailer... \n"));
    assert!(out.contains("The test email will be sent to me@example.com (really sent to qa@example.com).\n"));
    assert!(out.ends_with("1 email sent by flushing the default mailer spool.\n"));
    assert_eq!(transport.sent_to(), ["qa@example.com"]);
    assert_eq!(transport.sent()[0].subject, "Mailspool Test Email");
}

#[tokio::test]
async fn test_new_email_uses_default_mailer() {
    let transport = MockTransport::new();
    let registry = registry(r#"(mailers: { "default": (transport: Some("sendmail")) })"#)
        .with_transport("default", Arc::new(transport.clone()));
    let options = NewEmail {
        from: "Ops <ops@example.com>".to_string(),
        to: "a@x.com, b@y.com".to_string(),
        subject: "Maintenance".to_string(),
        body: "<p>Tonight</p>".to_string(),
        content_type: "text/html".to_string(),
        charset: "UTF-8".to_string(),
        mailer: None,
    };
    let mut out = Vec::new();

    commands::new_email(&registry, &options, &mut out).await.unwrap();

    assert_eq!(output(out), "Sent 1 emails\n");
    assert_eq!(transport.starts(), 1);
    assert_eq!(transport.stops(), 1);

    let sent = transport.sent();
    assert_eq!(sent[0].to.len(), 2);
    assert_eq!(sent[0].from[0].name.as_deref(), Some("Ops"));
    assert_eq!(sent[0].content_type, "text/html");
}
