//! # Poll dispatcher
//!
//! Drives one poll cycle over the command inbox:
//!
//! ```text
//! ensure_layout ─▶ list_pending ─▶ for each file, in name order:
//!                                    read ─▶ decode ─▶ resolve ─▶ execute
//!                                      │        │          │          │
//!                                      └────────┴──── failure ───────┴─▶ failed/
//!                                                            success ───▶ processed/
//! ```
//!
//! Every per-file failure is isolated: the file is archived to `failed/` and
//! the cycle moves on. A store failure while listing aborts the cycle; the
//! next cycle starts from scratch. Only one cycle runs at a time per
//! [`Dispatcher`]; an overlapping call returns a skipped report.
//!
//! Handlers run on the blocking pool under a timeout, so a hung or panicking
//! handler fails its own command instead of stalling the bridge. A timed-out
//! handler ends its cycle early, and cycles are skipped until it returns.

mod dispatcher;
mod error;
mod journal;
mod report;

pub use dispatcher::{Dispatcher, DEFAULT_HANDLER_TIMEOUT};
pub use error::EntryError;
pub use journal::{CommandEvent, CommandEventKind, EventJournal};
pub use report::{CycleReport, CycleStatus, Disposition, EntryReport};
