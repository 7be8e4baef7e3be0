use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    catalog::TreatmentCatalog,
    domain::{Channel, OrgId, PatientId, Reminder, ReminderId, ReminderStatus},
    ports::ReminderStore,
    Error, Result,
};

/// A confirmed booking that may need a rebooking reminder.
#[derive(Clone, Debug, Deserialize)]
pub struct ScheduleInput {
    pub org_id: OrgId,
    pub patient_id: PatientId,
    pub phone: String,
    #[serde(default)]
    pub patient_name: String,
    pub service: String,
    #[serde(default)]
    pub provider: String,
    pub booked_at: DateTime<Utc>,
    #[serde(default)]
    pub channel: Option<Channel>,
}

/// Creates rebooking reminders after confirmed bookings.
pub struct Scheduler {
    store: Arc<dyn ReminderStore>,
    catalog: Arc<TreatmentCatalog>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ReminderStore>, catalog: Arc<TreatmentCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Persist a pending reminder for the booking.
    ///
    /// Returns `Ok(None)` when the service has no known rebooking interval;
    /// nothing is written in that case.
    pub async fn schedule(&self, input: ScheduleInput) -> Result<Option<Reminder>> {
        let Some(rebook_after) = self.catalog.rebook_after(&input.service, input.booked_at) else {
            tracing::info!(
                service = %input.service,
                org_id = %input.org_id,
                "no rebooking interval for service, skipping"
            );
            return Ok(None);
        };

        let now = Utc::now();
        let reminder = Reminder {
            id: ReminderId::new(),
            org_id: input.org_id,
            patient_id: input.patient_id,
            phone: input.phone,
            patient_name: input.patient_name,
            service: input.service,
            provider: input.provider,
            booked_at: input.booked_at,
            rebook_after,
            status: ReminderStatus::Pending,
            channel: input.channel.unwrap_or_default(),
            sent_at: None,
            dismissed_at: None,
            rebooked_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .create(&reminder)
            .await
            .map_err(|e| Error::Schedule(Box::new(e)))?;

        tracing::info!(
            id = %reminder.id,
            org_id = %reminder.org_id,
            service = %reminder.service,
            channel = reminder.channel.as_str(),
            rebook_after = %reminder.rebook_after.date_naive(),
            "reminder scheduled"
        );

        Ok(Some(reminder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DashboardStats;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records creates; optionally fails them.
    #[derive(Default)]
    struct RecordingStore {
        created: Mutex<Vec<Reminder>>,
        fail: bool,
    }

    #[async_trait]
    impl ReminderStore for RecordingStore {
        async fn create(&self, reminder: &Reminder) -> Result<()> {
            if self.fail {
                return Err(Error::Store("insert failed".to_string()));
            }
            self.created.lock().unwrap().push(reminder.clone());
            Ok(())
        }

        async fn list_due(&self, _as_of: DateTime<Utc>) -> Result<Vec<Reminder>> {
            unimplemented!()
        }

        async fn list_by_org(
            &self,
            _org_id: &OrgId,
            _status: Option<ReminderStatus>,
            _limit: usize,
        ) -> Result<Vec<Reminder>> {
            unimplemented!()
        }

        async fn mark_sent(&self, _id: ReminderId) -> Result<()> {
            unimplemented!()
        }

        async fn mark_booked(&self, _id: ReminderId) -> Result<()> {
            unimplemented!()
        }

        async fn dismiss(&self, _id: ReminderId) -> Result<()> {
            unimplemented!()
        }

        async fn dismiss_by_phone(&self, _org_id: &OrgId, _phone: &str) -> Result<u64> {
            unimplemented!()
        }

        async fn find_most_recent_sent_by_phone(
            &self,
            _org_id: &OrgId,
            _phone: &str,
        ) -> Result<Option<Reminder>> {
            unimplemented!()
        }

        async fn stats(&self, _org_id: &OrgId) -> Result<DashboardStats> {
            unimplemented!()
        }
    }

    fn input(service: &str) -> ScheduleInput {
        ScheduleInput {
            org_id: OrgId::from("org-1"),
            patient_id: PatientId(Uuid::new_v4()),
            phone: "+15550001111".to_string(),
            patient_name: "Jane".to_string(),
            service: service.to_string(),
            provider: "Dr. Lee".to_string(),
            booked_at: Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
            channel: None,
        }
    }

    fn scheduler(store: Arc<RecordingStore>) -> Scheduler {
        Scheduler::new(store, Arc::new(TreatmentCatalog::default()))
    }

    #[tokio::test]
    async fn known_service_creates_pending_reminder() {
        let store = Arc::new(RecordingStore::default());
        let r = scheduler(store.clone())
            .schedule(input("Botox"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(r.status, ReminderStatus::Pending);
        assert_eq!(r.channel, Channel::Sms);
        assert_eq!(r.rebook_after, r.booked_at + Duration::days(70));
        assert!(r.sent_at.is_none() && r.dismissed_at.is_none() && r.rebooked_at.is_none());

        let created = store.created.lock().unwrap().clone();
        assert_eq!(created, vec![r]);
    }

    #[tokio::test]
    async fn explicit_channel_is_kept() {
        let store = Arc::new(RecordingStore::default());
        let mut req = input("lip filler");
        req.channel = Some(Channel::Instagram);
        let r = scheduler(store).schedule(req).await.unwrap().unwrap();
        assert_eq!(r.channel, Channel::Instagram);
    }

    #[tokio::test]
    async fn unknown_service_is_a_silent_no_op() {
        let store = Arc::new(RecordingStore::default());
        let out = scheduler(store.clone())
            .schedule(input("Consultation"))
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(store.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates_as_schedule_error() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let err = scheduler(store).schedule(input("Botox")).await.unwrap_err();
        assert!(matches!(err, Error::Schedule(inner) if matches!(*inner, Error::Store(_))));
    }

    #[test]
    fn input_deserializes_without_optional_fields() {
        let raw = r#"{
            "org_id": "org-1",
            "patient_id": "6f1c3b0e-8d1a-4a53-9d83-0a4f7c1b2e11",
            "phone": "+15550001111",
            "service": "Botox",
            "booked_at": "2025-01-01T10:00:00Z"
        }"#;
        let req: ScheduleInput = serde_json::from_str(raw).unwrap();
        assert_eq!(req.org_id, OrgId::from("org-1"));
        assert!(req.channel.is_none());
        assert!(req.patient_name.is_empty());
    }
}
