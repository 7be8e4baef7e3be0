use std::{path::Path, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use rebook_core::{
    catalog::TreatmentCatalog,
    clinics::ClinicDirectory,
    config::Config,
    ports::{ClinicConfigProvider, ReminderStore, SmsTransport},
    scheduler::{ScheduleInput, Scheduler},
    store::MemoryReminderStore,
    transport::{LogSmsTransport, ThrottledSms},
    worker::Worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rebook_core::logging::init("rebookd")?;

    let cfg = Config::load()?;

    let catalog = Arc::new(TreatmentCatalog::default());
    let store: Arc<dyn ReminderStore> = Arc::new(MemoryReminderStore::new());
    let clinics: Arc<dyn ClinicConfigProvider> = match &cfg.clinics_file {
        Some(path) => {
            let dir = ClinicDirectory::load(path)
                .with_context(|| format!("loading clinics from {}", path.display()))?;
            if dir.is_empty() {
                tracing::warn!(path = %path.display(), "clinic directory is empty");
            }
            Arc::new(dir)
        }
        None => {
            tracing::warn!("REBOOK_CLINICS_FILE not set; every send will fail clinic lookup");
            Arc::new(ClinicDirectory::default())
        }
    };
    let sms: Arc<dyn SmsTransport> =
        Arc::new(ThrottledSms::new(Arc::new(LogSmsTransport), cfg.throttle()));

    if let Some(path) = &cfg.bookings_file {
        let scheduler = Scheduler::new(store.clone(), catalog.clone());
        seed_bookings(&scheduler, path).await?;
    }

    let worker = Worker::new(store, sms, clinics, catalog, cfg.worker_options());

    let cancel = CancellationToken::new();
    let run = {
        let worker = worker.clone();
        let cancel = cancel.clone();
        let every = cfg.poll_interval;
        tokio::spawn(async move { worker.run(every, cancel).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("shutdown requested");
    cancel.cancel();
    run.await.context("worker task panicked")?;

    Ok(())
}

async fn seed_bookings(scheduler: &Scheduler, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading bookings from {}", path.display()))?;
    let bookings: Vec<ScheduleInput> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let total = bookings.len();
    let mut scheduled = 0usize;
    for booking in bookings {
        if scheduler.schedule(booking).await?.is_some() {
            scheduled += 1;
        }
    }
    tracing::info!(total, scheduled, "bookings seeded");
    Ok(())
}
