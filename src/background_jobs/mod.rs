//! Background job scheduling and execution system.
//!
//! Runs the batch pipeline: source refreshes on a long interval and graph
//! rebuilds at startup, after each refresh and on their own interval.

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobScheduleInfo, SchedulerHandle};
pub use job::{BackgroundJob, HookEvent, JobError, JobRunStatus, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
