use serde::{Deserialize, Serialize};

use crate::{codec::encode_value, CodecError};

/// Sent from the authority to replicas to notify them of a field change.
///
/// On the wire this is a JSON object with exactly two string members,
/// `varName` and `data`. `data` holds the value codec's output for the new
/// value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynkPacket {
    #[serde(rename = "varName")]
    var_name: String,
    data: String,
}

impl SynkPacket {
    pub fn new(var_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
            data: data.into(),
        }
    }

    /// Build a packet carrying the encoded form of `value`
    pub fn for_value<T: Serialize>(var_name: &str, value: &T) -> Result<Self, CodecError> {
        let data = encode_value(var_name, value)?;
        Ok(Self::new(var_name, data))
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Serialize into the wire string
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|err| CodecError::EncodePacket {
            var_name: self.var_name.clone(),
            reason: err.to_string(),
        })
    }

    /// Parse a wire string. Anything that is not exactly a `{varName, data}`
    /// envelope yields `None`, so callers can fall back to treating the input
    /// as their own traffic.
    pub fn try_decode(encoded: &str) -> Option<Self> {
        serde_json::from_str(encoded).ok()
    }
}
