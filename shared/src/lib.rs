//! # Synk Shared
//! Mirrors fields of server-side instances to connected clients. Fields are
//! declared per instance on both sides; the authority broadcasts every real
//! change and produces catch-up data for clients that join late, replicas
//! apply what they receive.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod codec;
mod config;
mod error;
mod instance;
mod packet;
mod property;
mod registry;
mod synk;
mod types;

pub use codec::{decode_value, encode_value, SynkValue};
pub use config::SynkConfig;
pub use error::{CodecError, SendHandlerError, SynkError};
pub use instance::{InstanceKey, InstanceKeyGenerator};
pub use packet::SynkPacket;
pub use property::{Observer, ObserverKey, Property};
pub use registry::{ApplyCallback, SendHandler, SnapshotProvider, SynkRegistry};
pub use synk::Synk;
pub use types::SyncRole;
