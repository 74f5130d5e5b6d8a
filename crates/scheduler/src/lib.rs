//! In-process job scheduler for the ingestion pipeline.
//!
//! A single background tokio task wakes every poll interval and runs whatever
//! is due: one-shot jobs on the first tick after they are registered,
//! recurring jobs once their interval has elapsed since the last successful
//! run. Jobs within a tick run one after another, never concurrently.

mod core;
mod entry;
mod job;


pub use self::core::JobScheduler;
pub use self::entry::JobMode;
pub use self::job::{FnJob, Job};
