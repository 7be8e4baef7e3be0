use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Reminder id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub Uuid);

impl ReminderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReminderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Patient id (owned by the clinic's patient records).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub Uuid);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Clinic organization id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub String);

impl OrgId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a rebooking reminder. Strictly forward: no transition ever
/// returns to an earlier status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Booked,
    Dismissed,
}

impl ReminderStatus {
    pub const ALL: [ReminderStatus; 4] = [
        ReminderStatus::Pending,
        ReminderStatus::Sent,
        ReminderStatus::Booked,
        ReminderStatus::Dismissed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Booked => "booked",
            ReminderStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReminderStatus::Booked | ReminderStatus::Dismissed)
    }

    /// `pending` may move anywhere forward, `sent` only to a terminal status.
    pub fn can_transition_to(self, to: ReminderStatus) -> bool {
        match self {
            ReminderStatus::Pending => to != ReminderStatus::Pending,
            ReminderStatus::Sent => to.is_terminal(),
            ReminderStatus::Booked | ReminderStatus::Dismissed => false,
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ReminderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown reminder status: {s}")))
    }
}

/// Delivery channel for the outreach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Sms,
    Instagram,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Instagram => "instagram",
        }
    }
}

/// A scheduled rebooking outreach tied to one treatment booking.
///
/// Everything except `status` and the transition timestamps is fixed at
/// creation. Status only moves through [`Reminder::transition`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub org_id: OrgId,
    pub patient_id: PatientId,
    pub phone: String,
    pub patient_name: String,
    pub service: String,
    pub provider: String,
    pub booked_at: DateTime<Utc>,
    pub rebook_after: DateTime<Utc>,
    pub status: ReminderStatus,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebooked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Due means still pending and the rebook date has been reached.
    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.rebook_after <= as_of
    }

    /// Move to `to` if the state machine allows it, stamping the matching
    /// timestamp. A timestamp that is already set is never overwritten.
    pub fn transition(&mut self, to: ReminderStatus, at: DateTime<Utc>) -> Result<()> {
        let conflict = Error::StatusConflict {
            id: self.id,
            expected: expected_for(to),
        };
        if !self.status.can_transition_to(to) {
            return Err(conflict);
        }

        let stamp = match to {
            ReminderStatus::Sent => &mut self.sent_at,
            ReminderStatus::Booked => &mut self.rebooked_at,
            ReminderStatus::Dismissed => &mut self.dismissed_at,
            ReminderStatus::Pending => return Err(conflict),
        };
        stamp.get_or_insert(at);

        self.status = to;
        self.updated_at = at;
        Ok(())
    }
}

/// Human label for the status a transition to `to` requires.
fn expected_for(to: ReminderStatus) -> &'static str {
    match to {
        ReminderStatus::Sent => "pending",
        _ => "pending or sent",
    }
}

/// Aggregated rebooking metrics for the admin dashboard. Derived on read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub upcoming_count: u64,
    pub sent_count: u64,
    pub rebooked_count: u64,
    pub dismissed_count: u64,
    pub conversion_pct: f64,
}

impl DashboardStats {
    pub fn from_counts(upcoming: u64, sent: u64, rebooked: u64, dismissed: u64) -> Self {
        let outreached = sent + rebooked + dismissed;
        let conversion_pct = if outreached > 0 {
            rebooked as f64 / outreached as f64 * 100.0
        } else {
            0.0
        };
        Self {
            upcoming_count: upcoming,
            sent_count: sent,
            rebooked_count: rebooked,
            dismissed_count: dismissed,
            conversion_pct,
        }
    }
}
