//! Read-only queries backing the admin dashboard.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{DashboardStats, OrgId, Reminder, ReminderStatus},
    ports::ReminderStore,
    Error, Result,
};

pub const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Clone, Debug, Serialize)]
pub struct ReminderPage {
    pub reminders: Vec<Reminder>,
    pub count: usize,
}

pub struct AdminQueries {
    store: Arc<dyn ReminderStore>,
    max_page: usize,
}

impl AdminQueries {
    pub fn new(store: Arc<dyn ReminderStore>, max_page: usize) -> Self {
        Self {
            store,
            max_page: max_page.max(1),
        }
    }

    /// Reminders for a clinic, optionally filtered by status name. `limit` is
    /// capped at the configured page size; zero or `None` means the full page.
    pub async fn list_reminders(
        &self,
        org_id: &str,
        status: Option<&str>,
        limit: Option<usize>,
    ) -> Result<ReminderPage> {
        let org = require_org(org_id)?;
        let status = status
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ReminderStatus>)
            .transpose()?;
        let limit = match limit {
            Some(n) if n > 0 => n.min(self.max_page),
            _ => self.max_page,
        };

        let reminders = self
            .store
            .list_by_org(&org, status, limit)
            .await
            .map_err(|e| {
                tracing::error!(org_id = %org, error = %e, "listing reminders failed");
                e
            })?;
        Ok(ReminderPage {
            count: reminders.len(),
            reminders,
        })
    }

    pub async fn stats(&self, org_id: &str) -> Result<DashboardStats> {
        let org = require_org(org_id)?;
        self.store.stats(&org).await.map_err(|e| {
            tracing::error!(org_id = %org, error = %e, "loading stats failed");
            e
        })
    }
}

fn require_org(org_id: &str) -> Result<OrgId> {
    let org_id = org_id.trim();
    if org_id.is_empty() {
        return Err(Error::InvalidInput("missing org_id".to_string()));
    }
    Ok(OrgId(org_id.to_string()))
}
