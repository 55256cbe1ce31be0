//! Recurring transaction processing.
//!
//! [`RecurringProcessor::process`] loads a user's active templates and, for each one,
//! posts every occurrence that fell due since its cursor, in date order, advancing the
//! cursor with each post. A template whose next occurrence would land after its end date
//! is deactivated. An occurrence on the end date itself is still posted.
//!
//! Failures never escape `process`: listing failures abort the run, per-template
//! failures are logged and recorded in the [`RunReport`] and the next template is tried.
//! Only one run may be in flight per processor; overlapping calls return
//! [`ProcessOutcome::Skipped`] without touching storage.

use crate::{
    core::{
        ledger::{Ledger, PostFailure},
        template::{RecurringTemplate, TemplateUpdate, TransactionKind},
    },
    errors::Error,
};
use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// Default bound on occurrences posted for one template in a single run.
pub const DEFAULT_CATCH_UP_LIMIT: usize = 1000;

/// Source of "today" for the processor.
pub trait Clock: Send + Sync {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// One transaction posted during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedOccurrence {
    /// Template that produced it
    pub template_id: i64,
    /// Id of the stored transaction
    pub transaction_id: i64,
    /// Occurrence date
    pub date: NaiveDate,
    /// Amount posted
    pub amount: f64,
    /// Income or expense
    pub kind: TransactionKind,
}

/// Category of a per-template failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The stored template could not be interpreted
    Malformed,
    /// Writing the transaction failed; nothing changed
    NotRecorded,
    /// Transaction written but cursor not advanced; a duplicate may follow
    CursorNotAdvanced,
    /// Clearing the active flag of an exhausted template failed
    DeactivationFailed,
}

/// A template that could not be fully processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFailure {
    /// Template id
    pub template_id: i64,
    /// What went wrong
    pub reason: FailureReason,
    /// Error message
    pub detail: String,
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// User the run was for
    pub user_id: String,
    /// The "today" used for the run
    pub run_date: NaiveDate,
    /// Number of templates returned by the store
    pub templates_seen: usize,
    /// Transactions posted, in posting order
    pub generated: Vec<GeneratedOccurrence>,
    /// Templates deactivated during the run
    pub deactivated: Vec<i64>,
    /// Templates that hit an error
    pub failures: Vec<TemplateFailure>,
}

impl RunReport {
    fn new(user_id: &str, run_date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            run_date,
            templates_seen: 0,
            generated: Vec::new(),
            deactivated: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, template_id: i64, reason: FailureReason, detail: &Error) {
        self.failures.push(TemplateFailure {
            template_id,
            reason,
            detail: detail.to_string(),
        });
    }
}

/// Result of a call to [`RecurringProcessor::process`].
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The run finished; individual templates may still have failed
    Completed(RunReport),
    /// Another run was already in flight
    Skipped,
    /// Templates could not be listed; nothing was changed
    Aborted(Error),
}

impl ProcessOutcome {
    /// False only when the run was aborted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Aborted(_))
    }

    /// The run report, if the run completed.
    #[must_use]
    pub const fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped | Self::Aborted(_) => None,
        }
    }
}

/// Clears the busy flag when a run ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Materializes due occurrences of recurring templates.
#[derive(Debug)]
pub struct RecurringProcessor<S, C = SystemClock> {
    store: S,
    clock: C,
    busy: AtomicBool,
    catch_up_limit: usize,
}

impl<S: Ledger> RecurringProcessor<S> {
    /// Processor reading the wall clock.
    #[must_use]
    pub const fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock)
    }
}

impl<S: Ledger, C: Clock> RecurringProcessor<S, C> {
    /// Creates an idle processor.
    #[must_use]
    pub const fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            busy: AtomicBool::new(false),
            catch_up_limit: DEFAULT_CATCH_UP_LIMIT,
        }
    }

    /// Sets how many occurrences one template may post in a single run (minimum 1).
    #[must_use]
    pub fn with_catch_up_limit(mut self, limit: usize) -> Self {
        self.catch_up_limit = limit.max(1);
        self
    }

    /// The injected store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The injected clock.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether a run is currently in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Posts every due occurrence of `user_id`'s active templates.
    ///
    /// Returns [`ProcessOutcome::Skipped`] immediately if another run is in flight.
    #[instrument(skip(self))]
    pub async fn process(&self, user_id: &str) -> ProcessOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Recurring processing already in flight, skipping");
            return ProcessOutcome::Skipped;
        };

        let today = self.clock.today();
        let rows = match self.store.list_active_templates(user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to list recurring templates: {e}");
                return ProcessOutcome::Aborted(e);
            }
        };

        let mut report = RunReport::new(user_id, today);
        report.templates_seen = rows.len();

        for row in rows {
            let template_id = row.id;
            match RecurringTemplate::try_from(row) {
                Ok(template) => self.catch_up(&template, today, &mut report).await,
                Err(e) => {
                    warn!(template_id, "Skipping malformed recurring template: {e}");
                    report.fail(template_id, FailureReason::Malformed, &e);
                }
            }
        }

        info!(
            templates = report.templates_seen,
            generated = report.generated.len(),
            deactivated = report.deactivated.len(),
            failures = report.failures.len(),
            "Recurring processing finished"
        );

        ProcessOutcome::Completed(report)
    }

    /// Posts the due occurrences of a single template.
    async fn catch_up(&self, template: &RecurringTemplate, today: NaiveDate, report: &mut RunReport) {
        if !template.active {
            debug!(template_id = template.id, "Template inactive, not generating");
            return;
        }

        let mut candidate = match template.next_occurrence() {
            Ok(date) => date,
            Err(e) => {
                warn!(template_id = template.id, "Cannot step template: {e}");
                report.fail(template.id, FailureReason::Malformed, &e);
                return;
            }
        };

        if template.end_date.is_some_and(|end| candidate > end) {
            self.deactivate(template.id, report).await;
            return;
        }

        let mut posted = 0;
        while candidate <= today {
            if posted == self.catch_up_limit {
                info!(
                    template_id = template.id,
                    limit = self.catch_up_limit,
                    "Catch-up limit reached, remaining occurrences deferred"
                );
                return;
            }

            let next = template.frequency.step(candidate);
            if next.is_none() {
                warn!(
                    template_id = template.id,
                    "Schedule runs past the supported date range after {candidate}"
                );
            }
            // A schedule that cannot step further is treated as exhausted
            let expires = match (next, template.end_date) {
                (Some(next), Some(end)) => next > end,
                (Some(_), None) => false,
                (None, _) => true,
            };

            let update = TemplateUpdate {
                last_processed_date: Some(candidate),
                active: expires.then_some(false),
            };

            let entry = template.occurrence(candidate);
            match self
                .store
                .post_occurrence(&template.user_id, template.id, entry, update)
                .await
            {
                Ok(transaction_id) => {
                    debug!(template_id = template.id, %candidate, transaction_id, "Posted occurrence");
                    report.generated.push(GeneratedOccurrence {
                        template_id: template.id,
                        transaction_id,
                        date: candidate,
                        amount: template.amount,
                        kind: template.kind,
                    });
                }
                Err(PostFailure::NotRecorded(e)) => {
                    warn!(
                        template_id = template.id,
                        %candidate,
                        "Failed to record occurrence, will retry next run: {e}"
                    );
                    report.fail(template.id, FailureReason::NotRecorded, &e);
                    return;
                }
                Err(PostFailure::CursorNotAdvanced {
                    transaction_id,
                    source,
                }) => {
                    error!(
                        template_id = template.id,
                        %candidate,
                        transaction_id,
                        "Consistency risk: transaction recorded but cursor not advanced, \
                         the occurrence may be generated again: {source}"
                    );
                    report.fail(template.id, FailureReason::CursorNotAdvanced, &source);
                    return;
                }
            }

            posted += 1;

            match next {
                Some(next) if !expires => candidate = next,
                _ => {
                    info!(template_id = template.id, "Recurring template reached its end date, deactivated");
                    report.deactivated.push(template.id);
                    return;
                }
            }
        }
    }

    /// Clears the active flag of a template that can never fire again.
    async fn deactivate(&self, template_id: i64, report: &mut RunReport) {
        match self
            .store
            .update_template(template_id, TemplateUpdate::set_active(false))
            .await
        {
            Ok(()) => {
                info!(template_id, "Recurring template past its end date, deactivated");
                report.deactivated.push(template_id);
            }
            Err(e) => {
                warn!(template_id, "Failed to deactivate expired template: {e}");
                report.fail(template_id, FailureReason::DeactivationFailed, &e);
            }
        }
    }
}

/// Formats a run report into a human-readable summary.
#[must_use]
pub fn format_run_summary(report: &RunReport) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Recurring run {} - {} templates, {} posted, {} deactivated, {} failed\n",
        report.run_date.format("%Y-%m-%d"),
        report.templates_seen,
        report.generated.len(),
        report.deactivated.len(),
        report.failures.len()
    );

    // Writing to a String cannot fail
    for occurrence in &report.generated {
        let _ = writeln!(
            summary,
            "  #{} {} {} ${:.2}",
            occurrence.template_id,
            occurrence.date.format("%Y-%m-%d"),
            occurrence.kind,
            occurrence.amount
        );
    }
    for failure in &report.failures {
        let _ = writeln!(
            summary,
            "  #{} failed ({:?}): {}",
            failure.template_id, failure.reason, failure.detail
        );
    }

    summary
}
