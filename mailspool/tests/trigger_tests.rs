#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use mailspool::{Config, FlushOutcome, FlushTrigger, MailerRegistry, SkipReason};
use mailspool_common::{Mailbox, Message, MockTransport, Signal};
use tokio::sync::broadcast;

fn message(to: &str) -> Message {
    Message::builder()
        .from(Mailbox::new("app@example.com"))
        .to(Mailbox::new(to))
        .subject(format!("hello {to}"))
        .build()
}

fn registry(config: &str) -> MailerRegistry {
    let config: Config = config.parse().expect("valid config");
    MailerRegistry::from_config(&config).expect("valid registry")
}

const MEMORY: &str = r#"(
    mailers: {
        "default": (transport: None, spool: Some(Memory(capacity: None))),
    },
)"#;

fn memory_registry(transport: &MockTransport) -> Arc<MailerRegistry> {
    Arc::new(registry(MEMORY).with_transport("default", Arc::new(transport.clone())))
}

async fn queue_three(registry: &MailerRegistry) {
    let mailer = registry.default_mailer().await.unwrap();
    for to in ["a@x.com", "b@y.com", "c@z.com"] {
        assert_eq!(mailer.send(&message(to)).await.unwrap(), 1);
    }
}

async fn queued(registry: &MailerRegistry, name: &str) -> usize {
    registry
        .mailer(name)
        .await
        .unwrap()
        .spool()
        .expect("spooling mailer")
        .len()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_terminate_flushes_memory_spool_in_order() {
    let transport = MockTransport::new();
    let registry = memory_registry(&transport);
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    queue_three(&registry).await;
    assert_eq!(transport.attempts(), 0);

    let report = trigger.on_terminate().await;

    assert!(!report.suppressed);
    assert_eq!(transport.sent_to(), ["a@x.com", "b@y.com", "c@z.com"]);
    assert_eq!(report.sent(), 3);
    assert_eq!(queued(&registry, "default").await, 0);
    assert_eq!(transport.starts(), 1);
    assert_eq!(transport.stops(), 1);
}

#[tokio::test]
async fn test_failure_suppresses_every_flush() {
    let transport = MockTransport::new();
    let registry = memory_registry(&transport);
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    queue_three(&registry).await;
    trigger.on_failure();

    let report = trigger.on_terminate().await;

    assert!(report.suppressed);
    assert!(report.mailers.is_empty());
    assert_eq!(transport.attempts(), 0);
    assert_eq!(transport.starts(), 0);
    assert_eq!(queued(&registry, "default").await, 3);
}

#[tokio::test]
async fn test_next_unit_of_work_flushes_again() {
    let transport = MockTransport::new();
    let registry = memory_registry(&transport);
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    queue_three(&registry).await;
    trigger.on_failure();
    trigger.on_terminate().await;
    assert!(trigger.exception_occurred());

    trigger.on_start();
    assert!(!trigger.exception_occurred());
    let report = trigger.on_terminate().await;

    assert_eq!(report.sent(), 3);
    assert_eq!(queued(&registry, "default").await, 0);
}

#[tokio::test]
async fn test_file_spool_is_never_flushed_automatically() {
    let dir = tempfile::tempdir().unwrap();
    let config = format!(
        r#"(mailers: {{ "default": (transport: None, spool: Some(File(path: "{}"))) }})"#,
        dir.path().display()
    );
    let transport = MockTransport::new();
    let registry =
        Arc::new(registry(&config).with_transport("default", Arc::new(transport.clone())));
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    queue_three(&registry).await;
    let report = trigger.on_terminate().await;

    assert_eq!(
        report.outcome("default"),
        Some(&FlushOutcome::Skipped(SkipReason::NotMemorySpool("file")))
    );
    assert_eq!(transport.attempts(), 0);
    assert_eq!(queued(&registry, "default").await, 3);
}

#[tokio::test]
async fn test_unused_and_direct_mailers_are_skipped() {
    let registry = Arc::new(registry(
        r#"(mailers: {
            "default": (transport: None, spool: Some(Memory(capacity: None))),
            "direct": (transport: None),
            "idle": (transport: None, spool: Some(Memory(capacity: None))),
        })"#,
    ));
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    registry.mailer("direct").await.unwrap();
    let report = trigger.on_terminate().await;

    assert_eq!(
        report.outcome("idle"),
        Some(&FlushOutcome::Skipped(SkipReason::NotInstantiated))
    );
    assert_eq!(
        report.outcome("default"),
        Some(&FlushOutcome::Skipped(SkipReason::NotInstantiated))
    );
    assert_eq!(
        report.outcome("direct"),
        Some(&FlushOutcome::Skipped(SkipReason::SpoolDisabled))
    );
    assert!(!registry.is_instantiated("idle"));
}

#[tokio::test]
async fn test_failing_mailer_does_not_stop_the_others() {
    let broken = MockTransport::new();
    broken.refuse_start();
    let working = MockTransport::new();

    let registry = Arc::new(
        registry(
            r#"(
                default_mailer: "beta",
                mailers: {
                    "alpha": (transport: None, spool: Some(Memory(capacity: None))),
                    "beta": (transport: None, spool: Some(Memory(capacity: None))),
                },
            )"#,
        )
        .with_transport("alpha", Arc::new(broken.clone()))
        .with_transport("beta", Arc::new(working.clone())),
    );
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    trigger.on_start();
    for name in ["alpha", "beta"] {
        let mailer = registry.mailer(name).await.unwrap();
        mailer.send(&message(&format!("{name}@example.com"))).await.unwrap();
    }
    let report = trigger.on_terminate().await;

    assert!(matches!(report.outcome("alpha"), Some(FlushOutcome::Failed(_))));
    assert_eq!(working.sent_to(), ["beta@example.com"]);
    assert_eq!(report.flushed(), 1);
    assert_eq!(queued(&registry, "alpha").await, 1);
}

#[tokio::test]
async fn test_listen_follows_lifecycle_signals() {
    let transport = MockTransport::new();
    let registry = memory_registry(&transport);
    let trigger = FlushTrigger::new(Arc::clone(&registry));
    let (signals, receiver) = broadcast::channel(8);

    signals.send(Signal::Started).unwrap();
    queue_three(&registry).await;
    signals.send(Signal::Terminated).unwrap();
    drop(signals);

    trigger.listen(receiver).await;

    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn test_handle_reports_only_on_termination() {
    let registry = Arc::new(registry(MEMORY));
    let trigger = FlushTrigger::new(registry);

    assert_eq!(trigger.handle(Signal::Started).await, None);
    assert_eq!(trigger.handle(Signal::Failed).await, None);
    assert!(trigger.exception_occurred());

    let report = trigger.handle(Signal::Terminated).await.expect("report");
    assert!(report.suppressed);
}

#[tokio::test]
async fn test_run_unit_flushes_only_on_success() {
    let transport = MockTransport::new();
    let registry = memory_registry(&transport);
    let trigger = FlushTrigger::new(Arc::clone(&registry));

    let (result, report) = trigger
        .run_unit(async {
            queue_three(&registry).await;
            Err::<(), _>("request failed")
        })
        .await;
    assert_eq!(result, Err("request failed"));
    assert!(report.suppressed);
    assert_eq!(transport.attempts(), 0);

    let (result, report) = trigger.run_unit(async { Ok::<_, ()>(()) }).await;
    assert_eq!(result, Ok(()));
    assert_eq!(report.sent(), 3);
}
