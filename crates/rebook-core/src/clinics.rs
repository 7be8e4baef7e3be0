//! JSON-backed clinic directory.
//!
//! File shape:
//!
//! ```json
//! { "org-1": { "name": "Forever 22", "sms_from": "+15550000000" } }
//! ```

use std::{collections::HashMap, fs, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{domain::OrgId, ports::ClinicConfigProvider, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicEntry {
    pub name: String,
    pub sms_from: String,
}

#[derive(Clone, Debug, Default)]
pub struct ClinicDirectory {
    clinics: HashMap<OrgId, ClinicEntry>,
}

impl ClinicDirectory {
    pub fn new(clinics: HashMap<OrgId, ClinicEntry>) -> Result<Self> {
        for (org, entry) in &clinics {
            if org.as_str().trim().is_empty() {
                return Err(Error::Config("clinic with empty org id".to_string()));
            }
            if entry.name.trim().is_empty() || entry.sms_from.trim().is_empty() {
                return Err(Error::Config(format!(
                    "clinic {org} needs both name and sms_from"
                )));
            }
        }
        Ok(Self { clinics })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let clinics: HashMap<OrgId, ClinicEntry> = serde_json::from_str(raw)?;
        Self::new(clinics)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let dir = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), clinics = dir.len(), "clinic directory loaded");
        Ok(dir)
    }

    pub fn len(&self) -> usize {
        self.clinics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clinics.is_empty()
    }

    fn entry(&self, org_id: &OrgId) -> Result<&ClinicEntry> {
        self.clinics
            .get(org_id)
            .ok_or_else(|| Error::ClinicConfig(format!("unknown org: {org_id}")))
    }
}

#[async_trait]
impl ClinicConfigProvider for ClinicDirectory {
    async fn clinic_name(&self, org_id: &OrgId) -> Result<String> {
        Ok(self.entry(org_id)?.name.clone())
    }

    async fn sms_from_address(&self, org_id: &OrgId) -> Result<String> {
        Ok(self.entry(org_id)?.sms_from.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_org() {
        let dir = ClinicDirectory::from_json(
            r#"{"org-1": {"name": "Forever 22", "sms_from": "+15550000000"}}"#,
        )
        .unwrap();
        let org = OrgId::from("org-1");
        assert_eq!(dir.clinic_name(&org).await.unwrap(), "Forever 22");
        assert_eq!(dir.sms_from_address(&org).await.unwrap(), "+15550000000");
    }

    #[tokio::test]
    async fn unknown_org_is_clinic_config_error() {
        let dir = ClinicDirectory::default();
        assert!(dir.is_empty());
        let err = dir.clinic_name(&OrgId::from("nope")).await.unwrap_err();
        assert!(matches!(err, Error::ClinicConfig(_)));
    }

    #[test]
    fn rejects_blank_entries_and_bad_json() {
        assert!(matches!(
            ClinicDirectory::from_json(r#"{"org-1": {"name": " ", "sms_from": "+1"}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClinicDirectory::from_json("[1, 2]"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("rebook-clinics-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"org-9": {"name": "Glow", "sms_from": "+15551112222"}}"#,
        )
        .unwrap();
        let dir = ClinicDirectory::load(&path).unwrap();
        assert_eq!(dir.len(), 1);
        std::fs::remove_file(&path).unwrap();
    }
}
