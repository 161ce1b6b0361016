use thiserror::Error;

use crate::sensor::{FeedingEvent, ReadingFilter, SensorReading};

#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("database is busy")]
    Busy,
    #[error("not found")]
    NotFound,
    #[error("conflicting write")]
    Conflict,
    #[error("{0}")]
    Other(String),
}

/// Partitioned store for readings plus the fixed feeding-event partition.
///
/// Writes create a partition on demand, reads never do: `route_for_read`
/// reports `NotFound` for a name that was never written to.
///
/// Ingestion writes through `add_reading`, which does the routing of
/// `route_for_write` inside the same transaction as the insert.
/// `route_for_write` on its own creates an empty partition.
pub trait Database {
    type PartitionHandle;

    fn route_for_write(&self, name: &str) -> Result<Self::PartitionHandle, DatabaseError>;
    fn route_for_read(&self, name: &str) -> Result<Self::PartitionHandle, DatabaseError>;
    fn get_partitions(&self) -> Result<Vec<String>, DatabaseError>;

    /// Write route for readings: creates partition `name` if absent and
    /// inserts `reading`, both or neither.
    fn add_reading(&self, name: &str, reading: &SensorReading) -> Result<(), DatabaseError>;
    /// Newest first, at most `filter.limit` entries.
    fn get_readings(&self, handle: &Self::PartitionHandle, filter: &ReadingFilter)
        -> Result<Vec<SensorReading>, DatabaseError>;
    fn clear_partition(&self, name: &str) -> Result<usize, DatabaseError>;

    fn add_feeding_event(&self, event: &FeedingEvent) -> Result<(), DatabaseError>;
    /// Newest first, at most `limit` entries.
    fn get_feeding_events(&self, limit: i64) -> Result<Vec<FeedingEvent>, DatabaseError>;
}
