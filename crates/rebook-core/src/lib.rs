//! Core domain + application logic for post-treatment rebooking reminders.
//!
//! This crate is intentionally storage- and carrier-agnostic. The reminder store,
//! SMS transport and clinic configuration live behind ports (traits); reference
//! adapters are provided for local runs and tests.

pub mod admin;
pub mod catalog;
pub mod clinics;
pub mod compose;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod reply;
pub mod scheduler;
pub mod store;
pub mod transport;
pub mod worker;

pub use errors::{Error, Result};
