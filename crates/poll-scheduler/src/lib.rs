//! Periodic trigger for the bridge's poll cycle.
//!
//! [`PollScheduler`] owns at most one background task that awaits a trigger
//! future every `period`. Arming again replaces the previous task, so calling
//! startup code twice never produces two concurrent timers.

mod error;
mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{PollScheduler, DEFAULT_POLL_INTERVAL};
