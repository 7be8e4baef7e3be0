use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{DashboardStats, OrgId, Reminder, ReminderId, ReminderStatus},
    Result,
};

/// Hexagonal port for durable reminder storage.
///
/// Status changes are conditional updates: implementations must check the
/// current status and write the new one atomically, and report a zero-row
/// update as [`crate::Error::StatusConflict`] (distinct from
/// [`crate::Error::ReminderNotFound`]).
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn create(&self, reminder: &Reminder) -> Result<()>;

    /// Pending reminders with `rebook_after <= as_of`, earliest due first.
    async fn list_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>>;

    /// Reminders for one clinic ordered by due date, optionally filtered by status.
    async fn list_by_org(
        &self,
        org_id: &OrgId,
        status: Option<ReminderStatus>,
        limit: usize,
    ) -> Result<Vec<Reminder>>;

    /// `pending → sent`.
    async fn mark_sent(&self, id: ReminderId) -> Result<()>;

    /// `pending | sent → booked`.
    async fn mark_booked(&self, id: ReminderId) -> Result<()>;

    /// `pending | sent → dismissed`.
    async fn dismiss(&self, id: ReminderId) -> Result<()>;

    /// Dismiss every `sent` reminder for a phone within a clinic. Returns the
    /// number of reminders changed.
    async fn dismiss_by_phone(&self, org_id: &OrgId, phone: &str) -> Result<u64>;

    /// The `sent` reminder with the latest `sent_at` for a phone within a clinic.
    async fn find_most_recent_sent_by_phone(
        &self,
        org_id: &OrgId,
        phone: &str,
    ) -> Result<Option<Reminder>>;

    async fn stats(&self, org_id: &OrgId) -> Result<DashboardStats>;
}

/// Outbound SMS delivery.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<()>;
}

/// Per-clinic settings needed for outreach.
#[async_trait]
pub trait ClinicConfigProvider: Send + Sync {
    async fn clinic_name(&self, org_id: &OrgId) -> Result<String>;
    async fn sms_from_address(&self, org_id: &OrgId) -> Result<String>;
}
