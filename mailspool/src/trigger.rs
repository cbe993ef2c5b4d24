//! Automatic flushing of memory spools at the end of a unit of work.
//!
//! A unit of work is a request, a command invocation, a job. When it ends
//! normally, every mailer that was used and queues into a memory spool has its
//! spool flushed through its real transport. When it ended with an unhandled
//! failure, nothing is flushed: the queued messages may describe work that
//! never completed.
//!
//! File spools are left alone; they are drained by `mailspool spool send`.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use mailspool_common::{Signal, internal};
use mailspool_spool::{FlushOptions, FlushReport, SpoolKind};
use mailspool_transport::TransportKind;
use tokio::sync::broadcast;

use crate::registry::MailerRegistry;

/// Why a mailer was not flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The mailer was never used during this unit of work
    NotInstantiated,
    /// The mailer sends directly
    SpoolDisabled,
    /// The mailer's spool is not flushed automatically (file or service)
    NotMemorySpool(&'static str),
}

/// What happened to one mailer at termination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Flushed(FlushReport),
    Skipped(SkipReason),
    Failed(String),
}

/// What happened at termination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminateReport {
    /// Set when a failure earlier in the unit of work suppressed all flushing
    pub suppressed: bool,
    pub mailers: Vec<(String, FlushOutcome)>,
}

impl TerminateReport {
    /// Messages sent across all mailers
    #[must_use]
    pub fn sent(&self) -> usize {
        self.mailers
            .iter()
            .map(|(_, outcome)| match outcome {
                FlushOutcome::Flushed(report) => report.sent,
                _ => 0,
            })
            .sum()
    }

    #[must_use]
    pub fn outcome(&self, mailer: &str) -> Option<&FlushOutcome> {
        self.mailers
            .iter()
            .find(|(name, _)| name == mailer)
            .map(|(_, outcome)| outcome)
    }

    #[must_use]
    pub fn flushed(&self) -> usize {
        self.mailers
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FlushOutcome::Flushed(_)))
            .count()
    }
}

/// Flushes memory spools when a unit of work ends, unless it failed
#[derive(Debug)]
pub struct FlushTrigger {
    registry: Arc<MailerRegistry>,
    exception_occurred: AtomicBool,
    options: FlushOptions,
}

impl FlushTrigger {
    #[must_use]
    pub fn new(registry: Arc<MailerRegistry>) -> Self {
        let options = *registry.flush_options();
        Self {
            registry,
            exception_occurred: AtomicBool::new(false),
            options,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &MailerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn exception_occurred(&self) -> bool {
        self.exception_occurred.load(Ordering::SeqCst)
    }

    /// A new unit of work begins
    pub fn on_start(&self) {
        self.reset();
    }

    /// The current unit of work hit an unhandled failure
    pub fn on_failure(&self) {
        internal!(
            level = DEBUG,
            "Unit of work failed, spools will not be flushed"
        );
        self.exception_occurred.store(true, Ordering::SeqCst);
    }

    /// Forget a failure of a previous unit of work
    pub fn reset(&self) {
        self.exception_occurred.store(false, Ordering::SeqCst);
    }

    /// The current unit of work is over: flush every used memory spool
    ///
    /// A failing mailer does not prevent the others from being flushed.
    pub async fn on_terminate(&self) -> TerminateReport {
        if self.exception_occurred() {
            internal!(
                level = DEBUG,
                "Skipping spool flush after a failed unit of work"
            );
            return TerminateReport {
                suppressed: true,
                mailers: Vec::new(),
            };
        }

        let mut report = TerminateReport::default();
        for name in self.registry.names() {
            let outcome = self.flush_mailer(name).await;
            report.mailers.push((name.to_string(), outcome));
        }

        report
    }

    async fn flush_mailer(&self, name: &str) -> FlushOutcome {
        if !self.registry.is_instantiated(name) {
            internal!("Mailer {name} was not used, nothing to flush");
            return FlushOutcome::Skipped(SkipReason::NotInstantiated);
        }

        let mailer = match self.registry.mailer(name).await {
            Ok(mailer) => mailer,
            Err(e) => return FlushOutcome::Failed(e.to_string()),
        };

        let TransportKind::Spool(transport) = mailer.transport() else {
            return FlushOutcome::Skipped(SkipReason::SpoolDisabled);
        };

        let spool = transport.spool();
        if !matches!(spool, SpoolKind::Memory(_)) {
            internal!(
                "Mailer {name} uses a {} spool, not flushing it",
                spool.kind_name()
            );
            return FlushOutcome::Skipped(SkipReason::NotMemorySpool(spool.kind_name()));
        }

        match transport.flush_spool_with(&self.options).await {
            Ok(report) => {
                if !report.failed.is_empty() {
                    internal!(
                        level = ERROR,
                        "{} messages of mailer {name} were refused and kept in its spool",
                        report.failed.len()
                    );
                }
                internal!(
                    level = DEBUG,
                    "Flushed {} messages of mailer {name}",
                    report.sent
                );
                FlushOutcome::Flushed(report)
            }
            Err(e) => {
                internal!(
                    level = ERROR,
                    "Exception occurred while flushing email queue of mailer {name}: {e}"
                );
                FlushOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run `work` as one unit of work
    ///
    /// Signals the start, a failure if `work` returns an error, and the end,
    /// so memory spools are flushed only when `work` succeeded.
    pub async fn run_unit<F, T, E>(&self, work: F) -> (Result<T, E>, TerminateReport)
    where
        F: Future<Output = Result<T, E>>,
    {
        self.on_start();
        let result = work.await;
        if result.is_err() {
            self.on_failure();
        }

        let report = self.on_terminate().await;
        (result, report)
    }

    /// React to a lifecycle signal; termination yields its report
    pub async fn handle(&self, signal: Signal) -> Option<TerminateReport> {
        match signal {
            Signal::Started => {
                self.on_start();
                None
            }
            Signal::Failed => {
                self.on_failure();
                None
            }
            Signal::Terminated => Some(self.on_terminate().await),
        }
    }

    /// Handle signals until the sender side goes away
    pub async fn listen(&self, mut signals: broadcast::Receiver<Signal>) {
        loop {
            match signals.recv().await {
                Ok(signal) => {
                    self.handle(signal).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    internal!(level = WARN, "Missed {missed} lifecycle signals");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
