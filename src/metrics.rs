//! Internal events for metrics emission.
//!
//! Each event struct is a measurable occurrence in a run. No exporter is
//! installed by this crate; without a recorder the counters are no-ops.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    fn emit(self);
}

/// Records `InternalEvent::emit()` for the given event.
///
/// ```ignore
/// emit!(RecordsParsed { count: 10 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::InternalEvent::emit($event)
    };
}

/// Export lines decoded into records.
pub struct RecordsParsed {
    pub count: u64,
}
impl InternalEvent for RecordsParsed {
    fn emit(self) {
        trace!(count = self.count, "Records parsed");
        counter!("pna_records_parsed_total").increment(self.count);
    }
}

/// Outcome of the mapping join.
pub struct RecordsJoined {
    pub matched: u64,
    pub unmatched: u64,
}
impl InternalEvent for RecordsJoined {
    fn emit(self) {
        trace!(matched = self.matched, unmatched = self.unmatched, "Records joined");
        counter!("pna_records_matched_total").increment(self.matched);
        counter!("pna_records_unmatched_total").increment(self.unmatched);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
}
impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}
impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// A single object storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}
impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "pna_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Written,
    Skipped,
    Failed,
}
impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Written => "written",
            RunStatus::Skipped => "skipped",
            RunStatus::Failed => "failed",
        }
    }
}

/// Emitted once at the end of every run, so a skipped run and a failed run
/// can be told apart.
pub struct RunCompleted {
    pub status: RunStatus,
    pub reason: &'static str,
}
impl InternalEvent for RunCompleted {
    fn emit(self) {
        trace!(status = self.status.as_str(), reason = self.reason, "Run completed");
        counter!(
            "pna_runs_total",
            "status" => self.status.as_str(),
            "reason" => self.reason
        )
        .increment(1);
    }
}
