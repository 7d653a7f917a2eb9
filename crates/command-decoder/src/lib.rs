//! Command payload decoding.
//!
//! A payload is a JSON object:
//!
//! ```json
//! { "action": "add_funds", "params": { "amount": 100 }, "target": {} }
//! ```
//!
//! `action` is required and must be a non-blank string. `params` and
//! `target` default to empty objects when absent or `null`.

mod command;
mod decode;
mod error;

pub use command::{Command, Params, Target};
pub use decode::decode;
pub use error::{DecodeError, DecodeResult};
