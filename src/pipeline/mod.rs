//! Per-row thumbnail generation and the sequential batch driver

pub mod row;
pub mod batch;

pub use row::{RowOutcome, RowProcessor};
pub use batch::{run_batch, BatchSummary};
