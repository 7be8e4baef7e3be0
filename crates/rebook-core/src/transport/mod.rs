//! SMS transport adapters.

pub mod log;
pub mod throttled;

pub use log::LogSmsTransport;
pub use throttled::{ThrottleConfig, ThrottledSms};
