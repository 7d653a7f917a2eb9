use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action parameters, keyed by name.
pub type Params = Map<String, Value>;

/// Description of the entity an action applies to.
pub type Target = Map<String, Value>;

/// A decoded unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub target: Target,
}

impl Command {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Params::new(),
            target: Target::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_target(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.target.insert(key.into(), value.into());
        self
    }

    /// Serialize as a payload the decoder accepts.
    pub fn to_payload(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}
