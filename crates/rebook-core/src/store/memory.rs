use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    domain::{DashboardStats, OrgId, Reminder, ReminderId, ReminderStatus},
    ports::ReminderStore,
    Error, Result,
};

/// In-process reminder store.
///
/// Every conditional update checks and writes inside one critical section, so
/// concurrent workers racing on the same reminder see exactly one winner.
#[derive(Default)]
pub struct MemoryReminderStore {
    rows: Mutex<HashMap<ReminderId, Reminder>>,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.rows.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    async fn transition(&self, id: ReminderId, to: ReminderStatus) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let row = rows.get_mut(&id).ok_or(Error::ReminderNotFound(id))?;
        row.transition(to, Utc::now())
    }
}

fn by_due_date(rows: &mut [Reminder]) {
    rows.sort_by(|a, b| {
        a.rebook_after
            .cmp(&b.rebook_after)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn create(&self, reminder: &Reminder) -> Result<()> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&reminder.id) {
            return Err(Error::Store(format!(
                "reminder {} already exists",
                reminder.id
            )));
        }
        rows.insert(reminder.id, reminder.clone());
        Ok(())
    }

    async fn list_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let mut due: Vec<Reminder> = {
            let rows = self.rows.lock().await;
            rows.values().filter(|r| r.is_due(as_of)).cloned().collect()
        };
        by_due_date(&mut due);
        Ok(due)
    }

    async fn list_by_org(
        &self,
        org_id: &OrgId,
        status: Option<ReminderStatus>,
        limit: usize,
    ) -> Result<Vec<Reminder>> {
        let mut out: Vec<Reminder> = {
            let rows = self.rows.lock().await;
            rows.values()
                .filter(|r| &r.org_id == org_id)
                .filter(|r| status.map_or(true, |s| r.status == s))
                .cloned()
                .collect()
        };
        by_due_date(&mut out);
        out.truncate(limit);
        Ok(out)
    }

    async fn mark_sent(&self, id: ReminderId) -> Result<()> {
        self.transition(id, ReminderStatus::Sent).await
    }

    async fn mark_booked(&self, id: ReminderId) -> Result<()> {
        self.transition(id, ReminderStatus::Booked).await
    }

    async fn dismiss(&self, id: ReminderId) -> Result<()> {
        self.transition(id, ReminderStatus::Dismissed).await
    }

    async fn dismiss_by_phone(&self, org_id: &OrgId, phone: &str) -> Result<u64> {
        let now = Utc::now();
        let mut rows = self.rows.lock().await;
        let mut affected = 0u64;
        for row in rows.values_mut().filter(|r| {
            &r.org_id == org_id && r.phone == phone && r.status == ReminderStatus::Sent
        }) {
            row.transition(ReminderStatus::Dismissed, now)?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn find_most_recent_sent_by_phone(
        &self,
        org_id: &OrgId,
        phone: &str,
    ) -> Result<Option<Reminder>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|r| &r.org_id == org_id && r.phone == phone && r.status == ReminderStatus::Sent)
            .max_by_key(|r| (r.sent_at, r.created_at))
            .cloned())
    }

    async fn stats(&self, org_id: &OrgId) -> Result<DashboardStats> {
        let rows = self.rows.lock().await;
        let (mut upcoming, mut sent, mut booked, mut dismissed) = (0, 0, 0, 0);
        for r in rows.values().filter(|r| &r.org_id == org_id) {
            match r.status {
                ReminderStatus::Pending => upcoming += 1,
                ReminderStatus::Sent => sent += 1,
                ReminderStatus::Booked => booked += 1,
                ReminderStatus::Dismissed => dismissed += 1,
            }
        }
        Ok(DashboardStats::from_counts(upcoming, sent, booked, dismissed))
    }
}
