//! Outreach message texts.
//!
//! Every function here is a pure function of the reminder and the clinic name.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    catalog::{normalize_service, TreatmentCatalog},
    domain::Reminder,
};

const WEEK_SECS: f64 = 7.0 * 24.0 * 3600.0;
const MAX_WEEKS_SHOWN: i64 = 12;

/// Message body variant for a reminder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    Series,
    Botox,
    Filler,
    LipFiller,
    WeightLoss,
    Generic,
}

#[derive(Clone, Debug)]
pub struct MessageComposer {
    catalog: Arc<TreatmentCatalog>,
}

impl MessageComposer {
    pub fn new(catalog: Arc<TreatmentCatalog>) -> Self {
        Self { catalog }
    }

    /// Series treatments always get series phrasing; otherwise the normalized
    /// service name picks a special-cased template.
    pub fn template_for(&self, service: &str) -> Template {
        if self
            .catalog
            .lookup_duration(service)
            .is_some_and(|td| td.is_series)
        {
            return Template::Series;
        }

        match normalize_service(service).as_str() {
            "botox" | "tox" => Template::Botox,
            "dermal filler" | "filler" => Template::Filler,
            "lip filler" => Template::LipFiller,
            "weight loss" => Template::WeightLoss,
            _ => Template::Generic,
        }
    }

    pub fn compose(&self, r: &Reminder, clinic_name: &str) -> String {
        let name = display_name(r);
        let duration = human_duration(r.booked_at, r.rebook_after);

        match self.template_for(&r.service) {
            Template::Series => format!(
                "Hi {name}! It's been {duration} since your last {} session at {clinic_name}. Ready to continue your series? Reply YES to book your next appointment!",
                r.service.to_lowercase()
            ),
            Template::Botox => format!(
                "Hi {name}! 💉 It's been about {duration} since your Botox at {clinic_name}. Ready to keep those results fresh? Reply YES and I'll find available times for you!"
            ),
            Template::Filler => format!(
                "Hi {name}! It's been {duration} since your filler appointment at {clinic_name}. Thinking about a touch-up? Reply YES and I'll check availability for you 😊"
            ),
            Template::LipFiller => format!(
                "Hi {name}! 💋 It's been {duration} since your lip filler at {clinic_name}. Ready for a refresh? Reply YES and I'll find times that work for you!"
            ),
            Template::WeightLoss => format!(
                "Hi {name}! It's time for your monthly weight loss follow-up at {clinic_name}. Reply YES to schedule your next appointment!"
            ),
            Template::Generic => format!(
                "Hi {name}! It's been {duration} since your {} at {clinic_name}. Ready to schedule your next session? Reply YES and I'll find available times for you!",
                r.service
            ),
        }
    }

    /// Sent after a patient opts out.
    pub fn opt_out_text(&self, clinic_name: &str) -> String {
        format!(
            "No problem at all! We've removed this reminder. If you'd like to book in the future, just text us anytime. — {clinic_name}"
        )
    }

    /// Sent when a patient replies that they want to rebook.
    pub fn rebook_confirm_text(&self, r: &Reminder, clinic_name: &str) -> String {
        format!(
            "Great, {}! Let me find available times for your {} at {clinic_name}. One moment... 🗓️",
            display_name(r),
            r.service
        )
    }
}

fn display_name(r: &Reminder) -> &str {
    let name = r.patient_name.trim();
    if name.is_empty() {
        "there"
    } else {
        name
    }
}

/// Elapsed time rounded to the nearest week (at least one). Above twelve weeks
/// it is shown as `weeks / 4` months, truncated.
pub fn human_duration(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let secs = (to - from).num_seconds() as f64;
    let weeks = ((secs / WEEK_SECS).round() as i64).max(1);
    if weeks > MAX_WEEKS_SHOWN {
        format!("{} months", weeks / 4)
    } else {
        format!("{weeks} weeks")
    }
}
