//! Due-reminder worker and inbound reply handling.
//!
//! The worker never locks reminders itself. Every status change goes through a
//! status-conditioned store update; a zero-row update means another run (or
//! another reply) got there first and is treated as a skip.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::TreatmentCatalog,
    compose::MessageComposer,
    domain::{OrgId, Reminder, ReminderId},
    ports::{ClinicConfigProvider, ReminderStore, SmsTransport},
    reply::ReplyIntent,
    Error, Result,
};

#[derive(Clone, Copy, Debug)]
pub struct WorkerOptions {
    /// Upper bound for resolving, sending and marking one reminder.
    pub reminder_timeout: Duration,
    /// Reminders in flight at once during a run.
    pub concurrency: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            reminder_timeout: Duration::from_secs(10),
            concurrency: 1,
        }
    }
}

/// What the caller should do after an inbound reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyAction {
    /// Not a rebooking reply (or nothing to route it to).
    None,
    /// The reminder was dismissed; send the opt-out text.
    Dismiss,
    /// The patient wants to rebook. The reminder stays `sent` until the booking
    /// workflow confirms a real booking via [`Worker::confirm_rebooked`].
    Rebook,
}

impl ReplyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyAction::None => "",
            ReplyAction::Dismiss => "dismiss",
            ReplyAction::Rebook => "rebook",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReplyOutcome {
    pub action: ReplyAction,
    /// The reminder the reply was routed to, as found before any update.
    pub reminder: Option<Reminder>,
}

impl ReplyOutcome {
    fn none() -> Self {
        Self {
            action: ReplyAction::None,
            reminder: None,
        }
    }
}

#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    store: Arc<dyn ReminderStore>,
    sms: Arc<dyn SmsTransport>,
    clinics: Arc<dyn ClinicConfigProvider>,
    composer: MessageComposer,
    opts: WorkerOptions,
    /// Held for the whole of a `process_due` run.
    run_guard: Mutex<()>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        sms: Arc<dyn SmsTransport>,
        clinics: Arc<dyn ClinicConfigProvider>,
        catalog: Arc<TreatmentCatalog>,
        opts: WorkerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                store,
                sms,
                clinics,
                composer: MessageComposer::new(catalog),
                opts,
                run_guard: Mutex::new(()),
            }),
        }
    }

    pub fn composer(&self) -> &MessageComposer {
        &self.inner.composer
    }

    /// Send outreach for every reminder due at `now` and mark it sent.
    ///
    /// Returns how many reminders this run advanced to `sent`. Only a failure of
    /// the due query fails the run; per-reminder failures are logged and the
    /// reminder stays pending for the next run.
    ///
    /// A call made while another run on this worker is still in flight is
    /// skipped and returns `Ok(0)`.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let Ok(_running) = self.inner.run_guard.try_lock() else {
            tracing::debug!("previous run still in flight, skipping");
            return Ok(0);
        };

        let due = self.inner.store.list_due(now).await.map_err(|e| {
            tracing::error!(error = %e, "listing due reminders failed");
            e
        })?;
        if due.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = due.len(), "processing due reminders");

        let concurrency = self.inner.opts.concurrency.max(1);
        let mut tasks = JoinSet::new();
        let mut processed = 0usize;

        for reminder in due {
            if tasks.len() >= concurrency {
                if let Some(done) = tasks.join_next().await {
                    processed += finished(done);
                }
            }
            let worker = self.clone();
            tasks.spawn(async move { worker.process_guarded(reminder).await });
        }
        while let Some(done) = tasks.join_next().await {
            processed += finished(done);
        }

        Ok(processed)
    }

    async fn process_guarded(&self, reminder: Reminder) -> bool {
        let id = reminder.id;
        let limit = self.inner.opts.reminder_timeout;
        let res = match tokio::time::timeout(limit, self.process_one(&reminder)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(format!("reminder {id} after {limit:?}"))),
        };

        match res {
            Ok(()) => true,
            Err(e) if e.is_conflict() => {
                tracing::debug!(id = %id, "reminder already advanced by another run");
                false
            }
            Err(e) => {
                tracing::warn!(
                    id = %id,
                    org_id = %reminder.org_id,
                    error = %e,
                    "failed to process reminder"
                );
                false
            }
        }
    }

    async fn process_one(&self, r: &Reminder) -> Result<()> {
        let clinic_name = self.inner.clinics.clinic_name(&r.org_id).await?;
        let from = self.inner.clinics.sms_from_address(&r.org_id).await?;

        let body = self.inner.composer.compose(r, &clinic_name);
        self.inner.sms.send(&from, &r.phone, &body).await?;
        self.inner.store.mark_sent(r.id).await?;

        tracing::info!(id = %r.id, phone = %r.phone, service = %r.service, "reminder sent");
        Ok(())
    }

    /// Route an inbound reply to the patient's most recently sent reminder.
    pub async fn handle_reply(
        &self,
        org_id: &OrgId,
        phone: &str,
        body: &str,
    ) -> Result<ReplyOutcome> {
        let Some(reminder) = self
            .inner
            .store
            .find_most_recent_sent_by_phone(org_id, phone)
            .await?
        else {
            return Ok(ReplyOutcome::none());
        };

        match ReplyIntent::classify(body) {
            ReplyIntent::OptOut => match self.inner.store.dismiss(reminder.id).await {
                Ok(()) => {
                    tracing::info!(id = %reminder.id, phone, "patient opted out");
                    Ok(ReplyOutcome {
                        action: ReplyAction::Dismiss,
                        reminder: Some(reminder),
                    })
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(
                        id = %reminder.id,
                        "reminder already closed by a concurrent reply"
                    );
                    Ok(ReplyOutcome::none())
                }
                Err(e) => Err(e),
            },
            ReplyIntent::RebookConfirm => {
                tracing::info!(id = %reminder.id, phone, "patient wants to rebook");
                Ok(ReplyOutcome {
                    action: ReplyAction::Rebook,
                    reminder: Some(reminder),
                })
            }
            ReplyIntent::Unrecognized => Ok(ReplyOutcome::none()),
        }
    }

    /// Called by the booking workflow once the follow-up appointment exists.
    pub async fn confirm_rebooked(&self, id: ReminderId) -> Result<()> {
        self.inner.store.mark_booked(id).await?;
        tracing::info!(id = %id, "reminder rebooked");
        Ok(())
    }

    /// Dismiss every sent reminder for a phone (e.g. a carrier-level STOP).
    pub async fn opt_out_phone(&self, org_id: &OrgId, phone: &str) -> Result<u64> {
        let n = self.inner.store.dismiss_by_phone(org_id, phone).await?;
        tracing::info!(org_id = %org_id, phone, dismissed = n, "phone opted out");
        Ok(n)
    }

    /// Run `process_due` every `every` until `cancel` fires. A batch still in
    /// flight at cancellation is dropped; its reminders stay pending.
    pub async fn run(&self, every: Duration, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(every_secs = every.as_secs(), "rebooking worker started");
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                tokio::select! {
                  _ = cancel.cancelled() => break,
                  res = self.process_due(Utc::now()) => match res {
                    Ok(0) => tracing::debug!("no due reminders"),
                    Ok(n) => tracing::info!(sent = n, "worker run complete"),
                    Err(e) => tracing::error!(error = %e, "worker run failed"),
                  },
                }
              }
            }
        }
        tracing::info!("rebooking worker stopped");
    }
}

fn finished(done: std::result::Result<bool, tokio::task::JoinError>) -> usize {
    match done {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            tracing::warn!(error = %e, "reminder task aborted");
            0
        }
    }
}
