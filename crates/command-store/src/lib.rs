//! Directory-backed command store.
//!
//! Three sibling directories make up the store:
//!
//! ```text
//! <root>/commands/    inbox, written by external producers
//! <root>/processed/   commands whose handler succeeded
//! <root>/failed/      commands that could not be decoded, routed or executed
//! ```
//!
//! Pending entries are listed in lexicographic file-name order; producers
//! name files so that this order is the intended processing order. Archiving
//! is a single `rename`, so an entry is never visible in two directories.

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{CommandStore, Outcome, PendingEntry, StoreCounts, DEFAULT_EXTENSION};
