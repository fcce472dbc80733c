//! Price and availability (PnA) records from the WinePoS export.
//!
//! [`record`] decodes the positional export, [`mapping`] loads the product
//! mapping table and [`join`] combines the two into [`join::NormalizedRecord`]s.
pub mod join;
pub mod layout;
pub mod mapping;
pub mod record;

pub use join::{join, JoinSummary, NormalizedRecord};
pub use layout::{ColumnLayout, Field};
pub use mapping::{MappingEntry, MappingTable};
pub use record::{HeaderPolicy, SourceRecord};

pub mod result {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum MappingError {
        #[error("Mapping header is missing the `{0}` column")]
        MissingColumn(&'static str),
        #[error("Mapping row on line {line} has an empty item_num")]
        MissingItemKey { line: u64 },
        #[error("Unable to read mapping csv")]
        Csv(#[from] csv::Error),
    }

    #[derive(Debug, Error)]
    pub enum LayoutError {
        #[error("Column {index} is assigned to both `{first}` and `{second}`")]
        DuplicateIndex {
            index: usize,
            first: &'static str,
            second: &'static str,
        },
        #[error("Field `{0}` appears more than once in the layout")]
        DuplicateField(&'static str),
    }

    pub type Result<T, E = MappingError> = std::result::Result<T, E>;
}
