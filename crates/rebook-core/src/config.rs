use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    admin::DEFAULT_PAGE_LIMIT, errors::Error, transport::ThrottleConfig, worker::WorkerOptions,
    Result,
};

/// Typed configuration for a rebooking worker process.
#[derive(Clone, Debug)]
pub struct Config {
    // Worker
    pub poll_interval: Duration,
    pub reminder_timeout: Duration,
    pub worker_concurrency: usize,

    // Admin reads
    pub admin_page_limit: usize,

    // SMS throttling
    pub sms_global_interval: Duration,
    pub sms_per_phone_interval: Duration,

    // Data files
    pub clinics_file: Option<PathBuf>,
    pub bookings_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let throttle = ThrottleConfig::default();
        let worker = WorkerOptions::default();
        Self {
            poll_interval: Duration::from_secs(300),
            reminder_timeout: worker.reminder_timeout,
            worker_concurrency: worker.concurrency,
            admin_page_limit: DEFAULT_PAGE_LIMIT,
            sms_global_interval: throttle.global_min_interval,
            sms_per_phone_interval: throttle.per_phone_min_interval,
            clinics_file: None,
            bookings_file: None,
        }
    }
}

impl Config {
    /// Load from the environment, after applying `.env` from the working
    /// directory (existing variables win).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let u64_of = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());
        let usize_of = |key: &str| get(key).and_then(|s| s.trim().parse::<usize>().ok());
        let path_of = |key: &str| get(key).and_then(non_empty).map(PathBuf::from);

        let poll_interval = u64_of("REBOOK_POLL_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            return Err(Error::Config(
                "REBOOK_POLL_INTERVAL_SECS must be > 0".to_string(),
            ));
        }

        let reminder_timeout = u64_of("REBOOK_REMINDER_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.reminder_timeout);

        let worker_concurrency =
            usize_of("REBOOK_WORKER_CONCURRENCY").unwrap_or(defaults.worker_concurrency);
        if worker_concurrency == 0 {
            return Err(Error::Config(
                "REBOOK_WORKER_CONCURRENCY must be >= 1".to_string(),
            ));
        }

        let admin_page_limit =
            usize_of("REBOOK_ADMIN_PAGE_LIMIT").unwrap_or(defaults.admin_page_limit);
        if admin_page_limit == 0 {
            return Err(Error::Config(
                "REBOOK_ADMIN_PAGE_LIMIT must be >= 1".to_string(),
            ));
        }

        let sms_global_interval = u64_of("REBOOK_SMS_GLOBAL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.sms_global_interval);
        let sms_per_phone_interval = u64_of("REBOOK_SMS_PER_PHONE_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.sms_per_phone_interval);

        Ok(Self {
            poll_interval,
            reminder_timeout,
            worker_concurrency,
            admin_page_limit,
            sms_global_interval,
            sms_per_phone_interval,
            clinics_file: path_of("REBOOK_CLINICS_FILE"),
            bookings_file: path_of("REBOOK_BOOKINGS_FILE"),
        })
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            reminder_timeout: self.reminder_timeout,
            concurrency: self.worker_concurrency,
        }
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            global_min_interval: self.sms_global_interval,
            per_phone_min_interval: self.sms_per_phone_interval,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
