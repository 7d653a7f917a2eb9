//! Handler trait.

use crate::{HandlerResult, Params, Target};

/// One side-effecting operation bound to an action name.
///
/// Handlers only see the decoded `params` and `target`. They never see the
/// command file, the store, or other handlers.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, params: &Params, target: &Target) -> HandlerResult;
}

/// Adapts a plain function or closure into a [`CommandHandler`].
pub struct FnHandler<F>(pub F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&Params, &Target) -> HandlerResult + Send + Sync,
{
    fn handle(&self, params: &Params, target: &Target) -> HandlerResult {
        (self.0)(params, target)
    }
}
