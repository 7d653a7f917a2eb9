//! Handler registry for bridge commands.
//!
//! - [`CommandHandler`]: one side-effecting operation, given only
//!   `(params, target)`.
//! - [`HandlerRegistryBuilder`] / [`HandlerRegistry`]: the action name to
//!   handler table, frozen once built.
//! - [`builtin`]: the actions shipped with the bridge, bound to a
//!   [`HostPort`] that performs the actual effects.

pub mod builtin;
mod error;
mod handler;
mod host;
mod registry;

pub use builtin::{register_builtins, BuiltinAction};
pub use command_decoder::{Params, Target};
pub use error::{HandlerError, HandlerResult, HostError, RegistryError, RegistryResult};
pub use handler::{CommandHandler, FnHandler};
pub use host::{HostPort, HostState, InMemoryHost, Notification};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
