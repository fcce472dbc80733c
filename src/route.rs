//! Route key to store resolution.
//!
//! The store list is a single JSON parameter shaped like
//! `{"storeMapping": {"<route key>": {"storeId": "...", "merchantId": "..."}}}`.
//! A route key with no entry is a normal outcome, not an error.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{Storage, StorageError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Parameter `{0}` does not exist")]
    ParameterNotFound(String),
    #[error("Unable to fetch parameter `{name}`")]
    Fetch {
        name: String,
        #[source]
        source: StorageError,
    },
    #[error("Parameter store request for `{name}` failed")]
    Service {
        name: String,
        #[source]
        source: aws_sdk_ssm::Error,
    },
    #[error("Parameter `{name}` is not a valid store list")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Store mapping for `{route_key}` has no usable storeId")]
    InvalidEntry { route_key: String },
}

/// Read access to a key/value configuration store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the raw value of the parameter called `name`.
    async fn get_parameter(&self, name: &str) -> Result<String, ResolveError>;
}

/// Parameters held in memory. Used by tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryParameters {
    values: HashMap<String, String>,
}
impl InMemoryParameters {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}
#[async_trait]
impl ParameterStore for InMemoryParameters {
    async fn get_parameter(&self, name: &str) -> Result<String, ResolveError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::ParameterNotFound(name.to_string()))
    }
}

/// Parameters from AWS Systems Manager Parameter Store, read decrypted.
#[derive(Debug, Clone)]
pub struct SsmParameters {
    client: aws_sdk_ssm::Client,
}
impl SsmParameters {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
    /// Client using credentials and region from the environment.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_ssm::Client::new(&sdk_config))
    }
}
#[async_trait]
impl ParameterStore for SsmParameters {
    async fn get_parameter(&self, name: &str) -> Result<String, ResolveError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_parameter_not_found()) {
                    ResolveError::ParameterNotFound(name.to_string())
                } else {
                    ResolveError::Service {
                        name: name.to_string(),
                        source: aws_sdk_ssm::Error::from(err),
                    }
                }
            })?;
        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::ParameterNotFound(name.to_string()))
    }
}

/// Parameters stored as objects, one object per parameter name.
///
/// `/wine/base/storeList` is read from the object `wine/base/storeList`.
#[derive(Debug, Clone)]
pub struct ObjectParameters {
    storage: Storage,
}
impl ObjectParameters {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}
#[async_trait]
impl ParameterStore for ObjectParameters {
    async fn get_parameter(&self, name: &str) -> Result<String, ResolveError> {
        let key = name.trim_start_matches('/');
        let bytes = self.storage.get(key).await.map_err(|source| {
            if source.is_not_found() {
                ResolveError::ParameterNotFound(name.to_string())
            } else {
                ResolveError::Fetch {
                    name: name.to_string(),
                    source,
                }
            }
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The parameter store a deployed pipeline reads from.
///
/// Parameter Store unless a parameter bucket is configured.
#[derive(Debug, Clone)]
pub enum Parameters {
    Ssm(SsmParameters),
    Object(ObjectParameters),
}
#[async_trait]
impl ParameterStore for Parameters {
    async fn get_parameter(&self, name: &str) -> Result<String, ResolveError> {
        match self {
            Parameters::Ssm(ssm) => ssm.get_parameter(name).await,
            Parameters::Object(objects) => objects.get_parameter(name).await,
        }
    }
}

/// The store a route key delivers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationIdentity {
    pub store_id: String,
    pub merchant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(DestinationIdentity),
    NoDestination,
}

#[derive(Deserialize)]
struct StoreList {
    #[serde(rename = "storeMapping")]
    store_mapping: HashMap<String, serde_json::Value>,
}

/// Looks up route keys in the store list parameter.
pub struct DestinationResolver<P> {
    parameters: P,
    parameter_name: String,
}
impl<P: ParameterStore> DestinationResolver<P> {
    /// `parameter_base` is the prefix the `storeList` parameter lives under.
    pub fn new(parameters: P, parameter_base: &str) -> Self {
        Self {
            parameters,
            parameter_name: format!("{}/storeList", parameter_base.trim_end_matches('/')),
        }
    }
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
    /// Resolves `route_key` against the current store list.
    ///
    /// # Errors
    ///
    /// Fails when the parameter cannot be fetched, is not a store list, or the
    /// matching entry lacks a `storeId`. A missing entry is
    /// [`Resolution::NoDestination`].
    pub async fn resolve(&self, route_key: &str) -> Result<Resolution, ResolveError> {
        let raw = self.parameters.get_parameter(&self.parameter_name).await?;
        let store_list: StoreList =
            serde_json::from_str(&raw).map_err(|source| ResolveError::Malformed {
                name: self.parameter_name.clone(),
                source,
            })?;
        debug!(
            stores = store_list.store_mapping.len(),
            "Loaded store mapping"
        );
        let Some(details) = store_list.store_mapping.get(route_key) else {
            info!(route_key, "Store mapping not found");
            return Ok(Resolution::NoDestination);
        };
        let store_id = id_field(details, "storeId").ok_or_else(|| ResolveError::InvalidEntry {
            route_key: route_key.to_string(),
        })?;
        Ok(Resolution::Found(DestinationIdentity {
            store_id,
            merchant_id: id_field(details, "merchantId"),
        }))
    }
}

/// Reads an identifier that may be written as a JSON string or number.
fn id_field(details: &serde_json::Value, name: &str) -> Option<String> {
    match details.get(name)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
