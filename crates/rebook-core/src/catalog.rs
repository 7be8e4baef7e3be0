//! Treatment durations: how long a treatment's effect lasts and when the
//! rebooking outreach should fire.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::{Error, Result};

/// When a patient should be reminded to rebook after a treatment.
/// `min_weeks` is the earliest outreach, `max_weeks` the latest reasonable window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreatmentDuration {
    pub service_key: String,
    pub min_weeks: u32,
    pub max_weeks: u32,
    /// Delivered as a series of sessions (e.g. microneedling).
    pub is_series: bool,
}

impl TreatmentDuration {
    pub fn new(service: &str, min_weeks: u32, max_weeks: u32, is_series: bool) -> Self {
        Self {
            service_key: normalize_service(service),
            min_weeks,
            max_weeks,
            is_series,
        }
    }
}

/// Immutable lookup table of treatment durations, keyed by normalized service name.
#[derive(Clone, Debug)]
pub struct TreatmentCatalog {
    entries: Vec<TreatmentDuration>,
    by_key: HashMap<String, usize>,
}

impl Default for TreatmentCatalog {
    /// Standard rebooking intervals for common medspa services.
    fn default() -> Self {
        let entries = vec![
            TreatmentDuration::new("botox", 10, 14, false),
            TreatmentDuration::new("tox", 10, 14, false),
            TreatmentDuration::new("dermal filler", 26, 52, false),
            TreatmentDuration::new("lip filler", 26, 52, false),
            TreatmentDuration::new("filler", 26, 52, false),
            TreatmentDuration::new("microneedling", 4, 6, true),
            TreatmentDuration::new("chemical peel", 4, 6, true),
            TreatmentDuration::new("laser hair removal", 4, 6, true),
            TreatmentDuration::new("weight loss", 4, 5, false),
        ];
        let by_key = entries
            .iter()
            .enumerate()
            .map(|(idx, td)| (td.service_key.clone(), idx))
            .collect();
        Self { entries, by_key }
    }
}

impl TreatmentCatalog {
    pub fn new(entries: Vec<TreatmentDuration>) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(entries.len());
        for (idx, td) in entries.iter().enumerate() {
            validate_entry(td)?;
            if by_key.insert(td.service_key.clone(), idx).is_some() {
                return Err(Error::Config(format!(
                    "duplicate treatment: {}",
                    td.service_key
                )));
            }
        }
        Ok(Self { entries, by_key })
    }

    pub fn entries(&self) -> &[TreatmentDuration] {
        &self.entries
    }

    /// Exact match on the normalized name first, then substring containment in
    /// either direction. Among fuzzy candidates the longest key wins; equal
    /// lengths resolve to the earlier entry.
    pub fn lookup_duration(&self, service: &str) -> Option<&TreatmentDuration> {
        let key = normalize_service(service);
        if key.is_empty() {
            return None;
        }
        if let Some(&idx) = self.by_key.get(&key) {
            return self.entries.get(idx);
        }

        let mut best: Option<&TreatmentDuration> = None;
        for td in &self.entries {
            let candidate = td.service_key.as_str();
            if !key.contains(candidate) && !candidate.contains(key.as_str()) {
                continue;
            }
            if best.map_or(true, |b| candidate.len() > b.service_key.len()) {
                best = Some(td);
            }
        }
        best
    }

    /// Rebooking reminder date: `booked_at` plus the minimum interval.
    pub fn rebook_after(&self, service: &str, booked_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let td = self.lookup_duration(service)?;
        Some(booked_at + Duration::weeks(i64::from(td.min_weeks)))
    }
}

/// Lowercase + trim, the form catalog keys are stored in.
pub fn normalize_service(service: &str) -> String {
    service.trim().to_lowercase()
}

fn validate_entry(td: &TreatmentDuration) -> Result<()> {
    if td.service_key.is_empty() {
        return Err(Error::Config("treatment with empty service name".to_string()));
    }
    if td.min_weeks == 0 {
        return Err(Error::Config(format!(
            "treatment {} min_weeks must be > 0",
            td.service_key
        )));
    }
    if td.min_weeks > td.max_weeks {
        return Err(Error::Config(format!(
            "treatment {} min_weeks {} exceeds max_weeks {}",
            td.service_key, td.min_weeks, td.max_weeks
        )));
    }
    Ok(())
}
