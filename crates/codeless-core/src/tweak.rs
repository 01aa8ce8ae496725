//! Tweaks: named tunable values pushed by the editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ActionError;
use crate::messages::Payload;

/// A tweak value as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TweakValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl TweakValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(TweakValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(TweakValue::Int)
                .or_else(|| n.as_f64().map(TweakValue::Float)),
            Value::String(s) => Some(TweakValue::String(s.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantTweak {
    pub name: String,
    pub encoding: String,
    /// `None` re-applies the tweak's current value.
    pub value: Option<TweakValue>,
}

impl VariantTweak {
    /// Parse `{ "name": .., "encoding": .., "value"?: .. }`.
    pub fn from_descriptor(descriptor: &Payload) -> Result<Self, ActionError> {
        let name = descriptor
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("name"))?;

        let encoding = descriptor
            .get("encoding")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("encoding"))?;

        let value = descriptor.get("value").and_then(TweakValue::from_json);

        Ok(VariantTweak {
            name: name.to_string(),
            encoding: encoding.to_string(),
            value,
        })
    }
}
