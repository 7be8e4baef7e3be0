use crate::domain::ReminderId;

/// Core error type for the rebooking core.
///
/// Adapters (stores, transports, clinic lookups) map their specific errors into
/// this type so the worker can tell per-reminder failures from conflicts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("sms transport error: {0}")]
    Transport(String),

    #[error("clinic config error: {0}")]
    ClinicConfig(String),

    #[error("reminder not found: {0}")]
    ReminderNotFound(ReminderId),

    /// A status-conditioned update matched zero rows.
    #[error("no matching {expected} reminder with id {id}")]
    StatusConflict {
        id: ReminderId,
        expected: &'static str,
    },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("schedule failed: {0}")]
    Schedule(#[source] Box<Error>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Another writer already moved the reminder out of the expected status.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::StatusConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn conflict_is_distinguishable_from_missing() {
        let id = ReminderId(Uuid::nil());
        let conflict = Error::StatusConflict {
            id,
            expected: "pending",
        };
        assert!(conflict.is_conflict());
        assert!(!Error::ReminderNotFound(id).is_conflict());
        assert_eq!(
            conflict.to_string(),
            format!("no matching pending reminder with id {id}")
        );
    }
}
