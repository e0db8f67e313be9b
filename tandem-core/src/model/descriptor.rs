use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque session description or ICE candidate blob.
///
/// Signaling never looks inside; whatever JSON the producing transport
/// emitted is handed to the consuming transport as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(pub Value);

impl Descriptor {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Descriptor {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
