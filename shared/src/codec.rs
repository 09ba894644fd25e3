//! The value codec: turns a single field value into the string carried in a
//! packet's `data` member, and back.

use serde::{de::DeserializeOwned, Serialize};

use crate::CodecError;

/// Bound every synchronized field value must satisfy.
pub trait SynkValue: Serialize + DeserializeOwned + PartialEq + Clone + Send + Sync + 'static {}

impl<T> SynkValue for T where T: Serialize + DeserializeOwned + PartialEq + Clone + Send + Sync + 'static {}

/// Encode a value with the shared JSON codec
pub fn encode_value<T: Serialize>(var_name: &str, value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|err| CodecError::EncodeValue {
        var_name: var_name.to_string(),
        reason: err.to_string(),
    })
}

/// Decode a value previously produced by [`encode_value`]
pub fn decode_value<T: DeserializeOwned>(input: &str) -> Result<T, CodecError> {
    serde_json::from_str(input).map_err(|err| CodecError::DecodeValue {
        input: input.to_string(),
        reason: err.to_string(),
    })
}
