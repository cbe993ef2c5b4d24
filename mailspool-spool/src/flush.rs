//! Draining a spool through a real transport.
//!
//! Every record is claimed before it is handed to the transport, then either
//! completed (sent) or released back to the queue (failed). A message is
//! therefore never lost to a failed send and never sent by two flushers.
//!
//! A rejected message is requeued and the flush moves on to the next one. A
//! connection failure requeues the message and ends the flush, since every
//! following send would fail the same way.

use std::time::{Duration, Instant};

use mailspool_common::{Transport, internal, outgoing};

use crate::{SpoolError, SpooledMessageId, r#trait::BackingStore};

/// Bounds on a single flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOptions {
    /// Stop after this many messages have been handed to the transport
    pub message_limit: Option<usize>,
    /// Stop once this much wall-clock time has elapsed
    pub time_limit: Option<Duration>,
}

impl FlushOptions {
    #[must_use]
    pub const fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Why a flush ended before the queue was empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MessageLimit,
    TimeLimit,
}

/// A message the transport refused; it is back in the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMessage {
    pub id: SpooledMessageId,
    pub error: String,
}

/// Outcome of a flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Messages accepted by the transport, as counted by the transport
    pub sent: usize,
    /// Messages the transport refused, requeued
    pub failed: Vec<FailedMessage>,
    /// Records that could not be decoded and were set aside
    pub corrupt: usize,
    /// Set when a limit ended the flush early
    pub stopped: Option<StopReason>,
}

impl FlushReport {
    /// Whether every message handed to the transport was accepted
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.corrupt == 0
    }
}

/// Send every queued message of `store` through `transport`, in queue order.
///
/// The transport is started if it is not already, and in that case stopped
/// again exactly once before returning, whatever the outcome. An empty queue
/// returns an empty report without touching the transport.
///
/// # Errors
/// - [`SpoolError::Transport`] if the transport cannot be started or the
///   connection fails mid-flush (the message in flight is requeued)
/// - Storage errors from the backing store
pub async fn flush_queue<S>(
    store: &S,
    transport: &dyn Transport,
    options: &FlushOptions,
) -> crate::Result<FlushReport>
where
    S: BackingStore + ?Sized,
{
    let ids = store.list().await?;
    if ids.is_empty() {
        return Ok(FlushReport::default());
    }

    let started_here = !transport.is_started();
    if started_here {
        transport.start().await?;
    }

    let result = drain(store, ids, transport, options).await;

    if started_here && let Err(e) = transport.stop().await {
        outgoing!(level = WARN, "Failed to stop transport after flush: {e}");
    }

    result
}

async fn drain<S>(
    store: &S,
    ids: Vec<SpooledMessageId>,
    transport: &dyn Transport,
    options: &FlushOptions,
) -> crate::Result<FlushReport>
where
    S: BackingStore + ?Sized,
{
    let deadline = options.time_limit.map(|limit| Instant::now() + limit);
    let mut report = FlushReport::default();
    let mut attempted = 0;

    for id in ids {
        if options.message_limit.is_some_and(|limit| attempted >= limit) {
            report.stopped = Some(StopReason::MessageLimit);
            break;
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            report.stopped = Some(StopReason::TimeLimit);
            break;
        }

        let message = match store.claim(&id).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                internal!(level = DEBUG, "Message {id} was claimed by another flusher");
                continue;
            }
            Err(SpoolError::Serialization(e)) => {
                internal!(level = WARN, "Skipping unreadable message {id}: {e}");
                report.corrupt += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        attempted += 1;

        match transport.send(&message).await {
            Ok(count) => {
                report.sent += count;
                outgoing!(level = DEBUG, "Sent spooled message {id}");

                // Already delivered; a leftover claim must not abort the flush
                if let Err(e) = store.complete(&id).await {
                    internal!(
                        level = ERROR,
                        "Sent message {id} could not be removed from the spool: {e}"
                    );
                }
            }
            Err(e) => {
                store.release(&id, message).await?;

                if e.is_connection_failure() {
                    outgoing!(
                        level = WARN,
                        "Connection failed while sending {id}, message requeued: {e}"
                    );
                    return Err(e.into());
                }

                outgoing!(level = WARN, "Message {id} rejected and requeued: {e}");
                report.failed.push(FailedMessage {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
