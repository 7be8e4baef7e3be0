//! Reminder store adapters.

pub mod memory;

pub use memory::MemoryReminderStore;
