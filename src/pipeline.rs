//! One run of the trigger: a single uploaded export in, at most one store
//! update out.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::emit;
use crate::error::{PipelineError, Result};
use crate::event::{ObjectRoute, S3Event, TriggerEvent};
use crate::metrics::{RecordsJoined, RecordsParsed, RunCompleted, RunStatus};
use crate::pna::join::{join, NormalizedRecord};
use crate::pna::layout::ColumnLayout;
use crate::pna::mapping::MappingTable;
use crate::pna::record::{parse_export, HeaderPolicy, SourceRecord};
use crate::route::{
    DestinationIdentity, DestinationResolver, ObjectParameters, ParameterStore, Parameters,
    Resolution, SsmParameters,
};
use crate::storage::Storage;

/// Why a run ended without writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The object key is not `{prefix}/{owner}/{route_key}`.
    MalformedKey(String),
    /// The key lives outside the upload prefix.
    IrrelevantPrefix(String),
    /// The event came from a bucket other than the source bucket.
    WrongBucket(String),
    /// No store is configured for the route key.
    NoDestination(String),
}
impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MalformedKey(_) => "malformed_key",
            SkipReason::IrrelevantPrefix(_) => "irrelevant_prefix",
            SkipReason::WrongBucket(_) => "wrong_bucket",
            SkipReason::NoDestination(_) => "no_destination",
        }
    }
}

/// What a successful run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    pub destination: DestinationIdentity,
    pub bucket: String,
    pub key: String,
    pub records: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(EmitReport),
    Skipped(SkipReason),
}
impl Outcome {
    pub fn wrote(&self) -> bool {
        matches!(self, Outcome::Written(_))
    }
}

/// Response returned to the invoker for every run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}
impl InvocationResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: r#"{"Message":"Success"}"#.to_string(),
        }
    }
}

/// Loads, parses, joins and routes a single uploaded export.
pub struct Pipeline<P> {
    config: Config,
    layout: ColumnLayout,
    source: Storage,
    destination: Storage,
    resolver: DestinationResolver<P>,
}
impl Pipeline<Parameters> {
    /// Pipeline backed by the S3 buckets named in `config`.
    ///
    /// The store list is read from Parameter Store, or from
    /// `parameter_bucket` when one is configured.
    pub async fn s3(config: Config) -> Result<Self> {
        let source = Storage::s3(&config.source_bucket).map_err(ConfigError::from)?;
        let destination = Storage::s3(&config.upload_bucket).map_err(ConfigError::from)?;
        let parameters = match &config.parameter_bucket {
            Some(bucket) => {
                let storage = Storage::s3(bucket).map_err(ConfigError::from)?;
                Parameters::Object(ObjectParameters::new(storage))
            }
            None => Parameters::Ssm(SsmParameters::from_env().await),
        };
        Self::new(config, source, destination, parameters)
    }
}
impl<P: ParameterStore> Pipeline<P> {
    /// # Errors
    ///
    /// Fails if the column layout does not validate.
    pub fn new(
        config: Config,
        source: Storage,
        destination: Storage,
        parameters: P,
    ) -> Result<Self> {
        Self::with_layout(config, ColumnLayout::winepos(), source, destination, parameters)
    }
    pub fn with_layout(
        config: Config,
        layout: ColumnLayout,
        source: Storage,
        destination: Storage,
        parameters: P,
    ) -> Result<Self> {
        layout.validate().map_err(ConfigError::from)?;
        let resolver = DestinationResolver::new(parameters, &config.parameter_base);
        Ok(Self {
            config,
            layout,
            source,
            destination,
            resolver,
        })
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    /// Runs the pipeline for a raw JSON notification.
    pub async fn handle_json(&self, raw: &str) -> Result<Outcome> {
        match S3Event::from_json(raw) {
            Ok(event) => self.handle(&event).await,
            Err(err) => {
                let err = PipelineError::from(err);
                record_outcome(&Err(&err));
                Err(err)
            }
        }
    }
    /// Runs the pipeline for one notification.
    ///
    /// Skips are returned as [`Outcome::Skipped`]; every error is fatal to
    /// the run and nothing is written.
    pub async fn handle(&self, event: &S3Event) -> Result<Outcome> {
        let span = info_span!(
            "pna_run",
            run_id = %Uuid::now_v7(),
            started_at = %Utc::now().to_rfc3339()
        );
        let result = self.run(event).instrument(span.clone()).await;
        span.in_scope(|| record_outcome(&result.as_ref()));
        result
    }
    async fn run(&self, event: &S3Event) -> Result<Outcome> {
        let trigger = event.trigger()?;
        info!(
            bucket = %trigger.bucket,
            key = %trigger.key,
            event_name = %trigger.event_name,
            "Received event"
        );
        let route = match self.filter(&trigger) {
            Ok(route) => route,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };

        let (table, records) =
            tokio::try_join!(self.load_mapping(), self.parse_source(&trigger.key))?;

        let (normalized, summary) = join(&table, &records);
        emit!(RecordsJoined {
            matched: summary.matched as u64,
            unmatched: summary.unmatched as u64,
        });
        debug!(matched = summary.matched, unmatched = summary.unmatched, "Mapped records");
        if self.config.header_policy == HeaderPolicy::Parse {
            if let Some(first) = records.first().filter(|r| !is_joined(&table, r)) {
                debug!(item_num = ?first.item_num(), "First row did not join, treated as header");
            }
        }

        let destination = match self.resolver.resolve(&route.route_key).await? {
            Resolution::Found(destination) => destination,
            Resolution::NoDestination => {
                return Ok(Outcome::Skipped(SkipReason::NoDestination(route.route_key)))
            }
        };
        let report = self.write(destination, &normalized).await?;
        Ok(Outcome::Written(report))
    }
    /// Returns the route of a relevant upload, or why it is skipped.
    fn filter(&self, trigger: &TriggerEvent) -> std::result::Result<ObjectRoute, SkipReason> {
        let Some(route) = ObjectRoute::parse(&trigger.key) else {
            return Err(SkipReason::MalformedKey(trigger.key.clone()));
        };
        if route.prefix != self.config.upload_prefix {
            return Err(SkipReason::IrrelevantPrefix(route.prefix));
        }
        if trigger.bucket != self.config.source_bucket {
            return Err(SkipReason::WrongBucket(trigger.bucket.clone()));
        }
        Ok(route)
    }
    async fn load_mapping(&self) -> Result<MappingTable> {
        let bytes = self
            .source
            .get(&self.config.mapping_key)
            .await
            .map_err(PipelineError::MappingFetch)?;
        let table = MappingTable::from_csv_bytes(&bytes)?;
        debug!(entries = table.len(), "Loaded mapping table");
        Ok(table)
    }
    async fn parse_source(&self, key: &str) -> Result<Vec<SourceRecord>> {
        let bytes = self
            .source
            .get(key)
            .await
            .map_err(PipelineError::SourceFetch)?;
        let content = String::from_utf8_lossy(&bytes);
        let records = parse_export(&content, &self.layout, self.config.header_policy);
        emit!(RecordsParsed {
            count: records.len() as u64,
        });
        debug!(records = records.len(), "Parsed PnA export");
        Ok(records)
    }
    async fn write(
        &self,
        destination: DestinationIdentity,
        records: &[NormalizedRecord],
    ) -> Result<EmitReport> {
        let body = self.config.output_format.encode(records)?;
        let key = self.config.output_key(&destination.store_id);
        let bytes = body.len();
        self.destination
            .put(&key, Bytes::from(body))
            .await
            .map_err(PipelineError::Emit)?;
        Ok(EmitReport {
            destination,
            bucket: self.destination.bucket().to_string(),
            key,
            records: records.len(),
            bytes,
        })
    }
}

fn is_joined(table: &MappingTable, record: &SourceRecord) -> bool {
    record.item_num().is_some_and(|key| table.contains_key(key))
}

fn record_outcome(result: &std::result::Result<&Outcome, &PipelineError>) {
    match result {
        Ok(Outcome::Written(report)) => {
            info!(
                store_id = %report.destination.store_id,
                bucket = %report.bucket,
                key = %report.key,
                records = report.records,
                bytes = report.bytes,
                "PnA file has been uploaded"
            );
            emit!(RunCompleted {
                status: RunStatus::Written,
                reason: "written",
            });
        }
        Ok(Outcome::Skipped(reason)) => {
            match reason {
                SkipReason::WrongBucket(bucket) => warn!(%bucket, "Wrong bucket, not processing"),
                other => info!(reason = other.as_str(), detail = ?other, "Not processing upload"),
            }
            emit!(RunCompleted {
                status: RunStatus::Skipped,
                reason: reason.as_str(),
            });
        }
        Err(err) => {
            error!(error = %err, kind = err.kind(), "Run failed");
            emit!(RunCompleted {
                status: RunStatus::Failed,
                reason: err.kind(),
            });
        }
    }
}
