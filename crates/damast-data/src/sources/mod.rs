//! Raw-data suppliers

pub mod json_source;

pub use json_source::JsonFileSource;

use async_trait::async_trait;

use crate::filter::FilterState;
use crate::model::RawDataset;
use crate::DataError;

/// Trait for dataset suppliers (the live data endpoint, a stored report, a file)
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the full entity graph
    async fn fetch(&self) -> Result<RawDataset, DataError>;

    /// Filter state stored with a report, replayed right after load
    async fn saved_state(&self) -> Result<Option<FilterState>, DataError> {
        Ok(None)
    }

    /// Get the source name/path
    fn source_name(&self) -> &str;
}
