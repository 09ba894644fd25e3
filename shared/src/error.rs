use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

use crate::{InstanceKey, SyncRole};

/// Errors returned by [`Synk`](crate::Synk), [`Property`](crate::Property)
/// and [`SynkRegistry`](crate::SynkRegistry)
#[derive(Debug, Clone, Error)]
pub enum SynkError {
    /// Role-restricted operation called on the wrong side
    #[error("{operation} can only be called on the {}, this side is the {role}", .role.invert())]
    WrongRole {
        operation: &'static str,
        role: SyncRole,
    },

    /// Well-formed packet addressed to an instance that declared no fields
    #[error("No Synk fields registered for {instance}")]
    UnknownInstance { instance: InstanceKey },

    /// Well-formed packet addressed to a field the instance never declared
    #[error("No Synk field registered for {instance} and varName {var_name}")]
    UnknownField {
        instance: InstanceKey,
        var_name: String,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A host send handler failed; the write that triggered it was already applied
    #[error(transparent)]
    SendHandler(#[from] SendHandlerError),
}

impl SynkError {
    /// Whether this error is a wiring mistake by the host rather than a
    /// runtime failure
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SynkError::WrongRole { .. }
                | SynkError::UnknownInstance { .. }
                | SynkError::UnknownField { .. }
        )
    }
}

/// Errors from the value codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Could not encode value of {var_name}: {reason}")]
    EncodeValue { var_name: String, reason: String },

    #[error("Could not decode value {input:?}: {reason}")]
    DecodeValue { input: String, reason: String },

    #[error("Could not encode packet for {var_name}: {reason}")]
    EncodePacket { var_name: String, reason: String },
}

/// Failure reported by a host send handler
#[derive(Clone)]
pub struct SendHandlerError {
    message: String,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl SendHandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error raised by the host transport
    pub fn from_error<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for SendHandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendHandlerError")
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for SendHandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Send handler failed: {}", self.message)
    }
}

impl StdError for SendHandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<String> for SendHandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SendHandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
