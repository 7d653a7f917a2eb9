//! Host port: the game-side effects the built-in actions perform.

use crate::HostError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Effects the built-in handlers need from the host application.
pub trait HostPort: Send + Sync {
    /// Add `amount` (may be negative) to the active household's funds.
    fn add_funds(&self, amount: i64) -> Result<(), HostError>;

    /// Apply `buff` to `sim_id`, or to the active sim when `None`.
    fn add_buff(&self, sim_id: Option<u64>, buff: &str) -> Result<(), HostError>;

    /// Show a notification to the player.
    fn notify(&self, title: &str, text: &str) -> Result<(), HostError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub text: String,
}

/// Snapshot of everything [`InMemoryHost`] tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// Funds of the active household; `None` when no household is loaded.
    #[serde(default)]
    pub household_funds: Option<i64>,
    #[serde(default)]
    pub active_sim: Option<u64>,
    /// Buffs currently applied, per sim id.
    #[serde(default)]
    pub sims: BTreeMap<u64, BTreeSet<String>>,
    /// Buff names the host recognizes; `None` accepts any name.
    #[serde(default)]
    pub known_buffs: Option<BTreeSet<String>>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl HostState {
    /// A loaded household with no funds and one active sim (id 1).
    pub fn starter() -> Self {
        Self {
            household_funds: Some(0),
            active_sim: Some(1),
            sims: BTreeMap::from([(1, BTreeSet::new())]),
            ..Self::default()
        }
    }

    fn add_funds(&mut self, amount: i64) -> Result<(), HostError> {
        let funds = self
            .household_funds
            .as_mut()
            .ok_or(HostError::NoActiveHousehold)?;
        *funds = funds
            .checked_add(amount)
            .ok_or(HostError::FundsOverflow)?;
        Ok(())
    }

    fn add_buff(&mut self, sim_id: Option<u64>, buff: &str) -> Result<(), HostError> {
        let sim_id = sim_id.or(self.active_sim).ok_or(HostError::NoActiveSim)?;
        if let Some(known) = &self.known_buffs {
            if !known.contains(buff) {
                return Err(HostError::UnknownBuff(buff.to_string()));
            }
        }
        let buffs = self
            .sims
            .get_mut(&sim_id)
            .ok_or(HostError::SimNotFound(sim_id))?;
        buffs.insert(buff.to_string());
        Ok(())
    }

    fn notify(&mut self, title: &str, text: &str) {
        self.notifications.push(Notification {
            title: title.to_string(),
            text: text.to_string(),
        });
    }
}

/// [`HostPort`] over an in-process [`HostState`].
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl InMemoryHost {
    pub fn new(state: HostState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> HostState {
        self.state.lock().clone()
    }
}

impl HostPort for InMemoryHost {
    fn add_funds(&self, amount: i64) -> Result<(), HostError> {
        self.state.lock().add_funds(amount)
    }

    fn add_buff(&self, sim_id: Option<u64>, buff: &str) -> Result<(), HostError> {
        self.state.lock().add_buff(sim_id, buff)
    }

    fn notify(&self, title: &str, text: &str) -> Result<(), HostError> {
        self.state.lock().notify(title, text);
        Ok(())
    }
}
