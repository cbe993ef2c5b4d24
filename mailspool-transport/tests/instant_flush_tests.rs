#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use mailspool_common::{Mailbox, Message, MockTransport, Transport};
use mailspool_spool::{FileBackingStore, MemoryBackingStore, Spool, SpoolKind};
use mailspool_transport::{FlushingTransport, SpoolTransport, TransportConfig, TransportKind};

fn message(to: &str) -> Message {
    Message::builder()
        .from(Mailbox::new("app@example.com"))
        .to(Mailbox::new(to))
        .build()
}

fn memory_flushing(real: &MockTransport) -> FlushingTransport {
    FlushingTransport::new(
        SpoolTransport::new(SpoolKind::Memory(Spool::new(MemoryBackingStore::new()))),
        Arc::new(real.clone()),
    )
}

#[tokio::test]
async fn test_toggle_without_sends_flushes_backlog_once() {
    let real = MockTransport::new();
    let transport = memory_flushing(&real);
    transport.send(&message("a@x.com")).await.unwrap();
    transport.send(&message("b@y.com")).await.unwrap();

    let report = transport.enable_instant_flush().await.unwrap();
    transport.disable_instant_flush();

    assert_eq!(report.sent, 2);
    assert_eq!(real.sent_to(), ["a@x.com", "b@y.com"]);
    assert_eq!(transport.spool().len().await.unwrap(), 0);
    assert_eq!(real.starts(), 1);

    // Back to queueing
    transport.send(&message("c@z.com")).await.unwrap();
    assert_eq!(real.attempts(), 2);
    assert_eq!(transport.spool().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_toggle_on_empty_spool_leaves_it_empty() {
    let real = MockTransport::new();
    let transport = memory_flushing(&real);

    transport.enable_instant_flush().await.unwrap();
    transport.disable_instant_flush();

    assert_eq!(real.attempts(), 0);
    assert_eq!(transport.spool().len().await.unwrap(), 0);
    assert!(!transport.is_instant_flush());
}

#[tokio::test]
async fn test_instant_flush_on_file_spool() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBackingStore::builder()
        .path(dir.path().to_path_buf())
        .build()
        .unwrap();
    let spool = Spool::new(store);
    spool.init().unwrap();

    let real = MockTransport::new();
    let transport =
        FlushingTransport::new(SpoolTransport::new(SpoolKind::File(spool)), Arc::new(real.clone()));
    transport.enable_instant_flush().await.unwrap();

    transport.send(&message("a@x.com")).await.unwrap();

    assert_eq!(real.sent_to(), ["a@x.com"]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_transport_kind_exposes_spool_and_real_transport() {
    let real = MockTransport::new();
    let kind = TransportKind::Spool(Arc::new(memory_flushing(&real)));

    kind.as_transport().send(&message("a@x.com")).await.unwrap();
    assert_eq!(kind.spool().unwrap().len().await.unwrap(), 1);
    assert!(!kind.real_transport().is_started());

    let direct = TransportKind::Direct(TransportConfig::Null.build(&[]));
    assert!(direct.spool().is_none());
    assert_eq!(direct.as_transport().send(&message("a@x.com")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delivery_addresses_wrap_the_real_transport() {
    let transport = TransportConfig::Null.build(&[Mailbox::new("qa@example.com")]);
    assert!(format!("{transport:?}").contains("RedirectingTransport"));
}
