//! Actions shipped with the bridge.
//!
//! | action              | params                         | target            |
//! |---------------------|--------------------------------|-------------------|
//! | `noop`              | none                           | none              |
//! | `add_funds`         | `amount`: integer, 0 = no-op   | none              |
//! | `add_buff`          | `buff`: buff name, required    | `sim_id`, optional|
//! | `send_notification` | `title`, `text`: strings       | none              |
//!
//! Integers may be sent as JSON numbers or numeric strings.

use crate::{
    CommandHandler, HandlerError, HandlerRegistryBuilder, HandlerResult, HostPort, Params, Target,
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_NOTIFICATION_TITLE: &str = "Notification";

/// Every action the bridge knows how to perform out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAction {
    Noop,
    AddFunds,
    AddBuff,
    SendNotification,
}

impl BuiltinAction {
    pub const ALL: [BuiltinAction; 4] = [
        BuiltinAction::Noop,
        BuiltinAction::AddFunds,
        BuiltinAction::AddBuff,
        BuiltinAction::SendNotification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinAction::Noop => "noop",
            BuiltinAction::AddFunds => "add_funds",
            BuiltinAction::AddBuff => "add_buff",
            BuiltinAction::SendNotification => "send_notification",
        }
    }
}

impl fmt::Display for BuiltinAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinAction {
    type Err = crate::RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| crate::RegistryError::UnknownAction(s.to_string()))
    }
}

/// Register every [`BuiltinAction`] against `host`.
///
/// # Panics
///
/// Panics if the builder already holds one of the built-in names.
pub fn register_builtins(
    builder: HandlerRegistryBuilder,
    host: Arc<dyn HostPort>,
) -> HandlerRegistryBuilder {
    BuiltinAction::ALL.into_iter().fold(builder, |builder, action| {
        builder.register(
            action.as_str(),
            BuiltinHandler {
                action,
                host: host.clone(),
            },
        )
    })
}

struct BuiltinHandler {
    action: BuiltinAction,
    host: Arc<dyn HostPort>,
}

impl CommandHandler for BuiltinHandler {
    fn handle(&self, params: &Params, target: &Target) -> HandlerResult {
        match self.action {
            BuiltinAction::Noop => Ok(()),
            BuiltinAction::AddFunds => add_funds(self.host.as_ref(), params),
            BuiltinAction::AddBuff => add_buff(self.host.as_ref(), params, target),
            BuiltinAction::SendNotification => send_notification(self.host.as_ref(), params),
        }
    }
}

fn add_funds(host: &dyn HostPort, params: &Params) -> HandlerResult {
    let amount = integer(params, "amount")?.unwrap_or(0);
    if amount == 0 {
        return Ok(());
    }
    host.add_funds(amount)?;
    info!(amount, "Added funds to household");
    Ok(())
}

fn add_buff(host: &dyn HostPort, params: &Params, target: &Target) -> HandlerResult {
    let buff = string(params, "buff")?
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| HandlerError::MissingParam("buff".to_string()))?;

    // 0 means "no sim selected", same as leaving it out.
    let sim_id = match integer(target, "sim_id")? {
        None | Some(0) => None,
        Some(id) => Some(
            u64::try_from(id)
                .map_err(|_| HandlerError::invalid_param("sim_id", "must not be negative"))?,
        ),
    };

    host.add_buff(sim_id, buff)?;
    info!(buff = %buff, sim_id = ?sim_id, "Buff added");
    Ok(())
}

fn send_notification(host: &dyn HostPort, params: &Params) -> HandlerResult {
    let title = string(params, "title")?.unwrap_or(DEFAULT_NOTIFICATION_TITLE);
    let text = string(params, "text")?.unwrap_or("");
    host.notify(title, text)?;
    info!(title = %title, "Notification shown");
    Ok(())
}

fn integer(map: &Params, name: &str) -> Result<Option<i64>, HandlerError> {
    let invalid = |got: String| {
        HandlerError::invalid_param(name, format!("expected an integer, got {}", got))
    };
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| whole_f64(n.as_f64()?))
            .map(Some)
            .ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(format!("{:?}", s))),
        Some(other) => Err(invalid(other.to_string())),
    }
}

/// `5.0` is accepted as `5`; fractional or out-of-range floats are not.
fn whole_f64(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < 9.0e15).then_some(value as i64)
}

fn string<'a>(map: &'a Params, name: &str) -> Result<Option<&'a str>, HandlerError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(HandlerError::invalid_param(
            name,
            format!("expected a string, got {}", other),
        )),
    }
}
