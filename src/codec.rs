//! Pluggable payload serialization.
//!
//! A [`Codec`] turns raw queue bodies into the payload type handlers
//! receive, and back. [`IdentityCodec`] is the pass-through default;
//! [`JsonCodec`] covers the common JSON-body case.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// A serializer/deserializer pair for message payloads.
///
/// `deserialize` must not fail for well-formed input matching the declared
/// schema, and must return [`CodecError::Deserialize`] otherwise; the
/// dispatcher converts that into a handler failure so the malformed
/// message is left for redelivery or dead-lettering.
pub trait Codec: Send + Sync {
    /// The decoded payload type handed to handlers.
    type Value: Send + Sync;

    fn deserialize(&self, body: &[u8]) -> Result<Self::Value, CodecError>;

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;
}

/// Pass-through codec: handlers receive the raw body bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    type Value = Vec<u8>;

    fn deserialize(&self, body: &[u8]) -> Result<Self::Value, CodecError> {
        Ok(body.to_vec())
    }

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }
}

/// JSON codec for any serde type; defaults to `serde_json::Value` for
/// schemaless payloads.
#[derive(Debug)]
pub struct JsonCodec<T = serde_json::Value> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: DeserializeOwned + Serialize + Send + Sync,
{
    type Value = T;

    fn deserialize(&self, body: &[u8]) -> Result<Self::Value, CodecError> {
        serde_json::from_slice(body).map_err(|e| CodecError::Deserialize(e.to_string()))
    }

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))
    }
}
