//! Object-created notifications and the routes encoded in object keys.

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event not found")]
    Missing,
    #[error("Event is not a storage notification")]
    Json(#[from] serde_json::Error),
    #[error("Event contains no records")]
    NoRecords,
    #[error("Object key `{0}` is not valid UTF-8 once decoded")]
    KeyEncoding(String),
}

/// An S3 event notification, as delivered to the trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// URL escaped, with `+` standing in for a space.
    pub key: String,
}

/// The object a run was triggered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub bucket: String,
    /// The decoded object key.
    pub key: String,
    pub event_name: String,
}
impl S3Event {
    pub fn from_json(raw: &str) -> Result<Self, EventError> {
        if raw.trim().is_empty() {
            return Err(EventError::Missing);
        }
        Ok(serde_json::from_str(raw)?)
    }
    /// The first record of the notification. Later records are ignored.
    pub fn trigger(&self) -> Result<TriggerEvent, EventError> {
        let record = self.records.first().ok_or(EventError::NoRecords)?;
        Ok(TriggerEvent {
            bucket: record.s3.bucket.name.clone(),
            key: decode_key(&record.s3.object.key)?,
            event_name: record.event_name.clone(),
        })
    }
}

/// Decodes an object key from a notification: `+` is a literal space and
/// everything else is percent-encoded.
pub fn decode_key(raw: &str) -> Result<String, EventError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|_| EventError::KeyEncoding(raw.to_string()))
}

/// `{prefix}/{owner}/{route_key}` decomposition of an upload key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRoute {
    pub prefix: String,
    pub owner: String,
    pub route_key: String,
}
impl ObjectRoute {
    /// Returns `None` unless the key has exactly three segments and a non
    /// empty route key.
    pub fn parse(key: &str) -> Option<Self> {
        let mut segments = key.split('/');
        let (prefix, owner, route_key) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() || route_key.is_empty() {
            return None;
        }
        Some(ObjectRoute {
            prefix: prefix.to_string(),
            owner: owner.to_string(),
            route_key: route_key.to_string(),
        })
    }
}
