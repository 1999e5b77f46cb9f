//! Sync scheduling: accumulates change batches and runs one sync at a time
//! on a steady heartbeat.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerError, SchedulerHandle, StateSnapshot, SyncJob};
