use std::collections::TryReserveError;
use thiserror::Error;

/// Failure to grow the bucket array of a `ChainedHashTable`.
///
/// Returned by `try_insert`; `insert` treats the same conditions as fatal.
/// The table is left untouched when either is reported.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("bucket count overflow: cannot grow {bucket_count} buckets by {factor}x", factor = crate::GROWTH_FACTOR)]
    CapacityOverflow { bucket_count: usize },
    #[error("failed to reserve bucket array: {0}")]
    AllocFailed(#[from] TryReserveError),
}
