//! Data module - acquisition, CSV loading and aggregation

pub mod acquire;
pub mod aggregator;
pub mod loader;
pub mod schema;

pub use acquire::{ensure_dataset, AcquireError, AcquireOutcome, DatasetFetcher, KaggleCli};
pub use aggregator::{AggregateError, Aggregates, Aggregator, CategorySeries};
pub use loader::{DataLoader, LoaderError, SalesTable};
