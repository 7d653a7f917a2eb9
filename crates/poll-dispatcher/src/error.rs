//! Per-entry failure causes.

use command_decoder::DecodeError;
use command_store::StoreError;
use handler_registry::{HandlerError, RegistryError};
use thiserror::Error;

/// Why a command file ended up in `failed/`. One variant per pipeline step.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error(transparent)]
    Read(StoreError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolve(#[from] RegistryError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl EntryError {
    /// Pipeline step that failed, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            EntryError::Read(_) => "read",
            EntryError::Decode(_) => "decode",
            EntryError::Resolve(_) => "resolve",
            EntryError::Handler(_) => "execute",
        }
    }
}
