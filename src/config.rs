//! Run configuration.
//!
//! Read from the environment the trigger is deployed with, or from a JSON
//! file with the same fields for local runs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::output::OutputFormat;
use crate::pna::record::HeaderPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable `{0}` is required")]
    MissingVar(&'static str),
    #[error("`{value}` is not a valid value for `{var}`")]
    InvalidValue { var: &'static str, value: String },
    #[error("`{0}` cannot be empty")]
    Empty(&'static str),
    #[error("Unable to read configuration file")]
    ReadFile(#[from] std::io::Error),
    #[error("Unable to parse configuration file")]
    Parse(#[from] serde_json::Error),
    #[error("Column layout is invalid")]
    Layout(#[from] crate::pna::result::LayoutError),
    #[error("Unable to set up storage")]
    Storage(#[from] crate::storage::StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bucket uploads are accepted from (`BUCKET_NAME`).
    pub source_bucket: String,
    /// Bucket normalized records are written to (`UPLOAD_BUCKET_NAME`).
    pub upload_bucket: String,
    /// Prefix of the `storeList` parameter (`WINE_POS_BASE`).
    pub parameter_base: String,
    /// Bucket holding parameters as objects (`PARAMETER_BUCKET`). Parameters
    /// come from AWS Parameter Store when unset.
    #[serde(default)]
    pub parameter_bucket: Option<String>,
    #[serde(default = "default_upload_prefix")]
    pub upload_prefix: String,
    #[serde(default = "default_mapping_key")]
    pub mapping_key: String,
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    #[serde(default)]
    pub header_policy: HeaderPolicy,
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_upload_prefix() -> String {
    "userUploads".to_string()
}
fn default_mapping_key() -> String {
    "productmappings/WinePoS/productmappings.csv".to_string()
}
fn default_output_prefix() -> String {
    "StorePnAUpdates/".to_string()
}

impl Config {
    /// Builds the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }
    /// Builds the configuration from any variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::MissingVar(name));

        let config = Config {
            source_bucket: required("BUCKET_NAME")?,
            upload_bucket: required("UPLOAD_BUCKET_NAME")?,
            parameter_base: required("WINE_POS_BASE")?,
            parameter_bucket: var("PARAMETER_BUCKET"),
            upload_prefix: var("POS_UPLOAD_PREFIX").unwrap_or_else(default_upload_prefix),
            mapping_key: var("POS_MAPPING_KEY").unwrap_or_else(default_mapping_key),
            output_prefix: var("POS_OUTPUT_PREFIX").unwrap_or_else(default_output_prefix),
            header_policy: parse_choice("POS_HEADER_POLICY", var("POS_HEADER_POLICY"))?,
            output_format: parse_choice("POS_OUTPUT_FORMAT", var("POS_OUTPUT_FORMAT"))?,
        };
        config.validate()?;
        Ok(config)
    }
    pub fn from_json_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }
    /// Object key a store's normalized records are written to.
    pub fn output_key(&self, store_id: &str) -> String {
        format!("{}{}", self.output_prefix, store_id)
    }
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("source_bucket", &self.source_bucket),
            ("upload_bucket", &self.upload_bucket),
            ("parameter_base", &self.parameter_base),
            ("upload_prefix", &self.upload_prefix),
            ("mapping_key", &self.mapping_key),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ConfigError::Empty(*name)),
            None => Ok(()),
        }
    }
}

/// Parses a lowercase serde enum name such as `skip` or `csv`.
fn parse_choice<T>(var: &'static str, value: Option<String>) -> Result<T, ConfigError>
where
    T: Default + serde::de::DeserializeOwned,
{
    let Some(value) = value else {
        return Ok(T::default());
    };
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
