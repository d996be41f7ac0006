//! Job orchestration
//!
//! ETL job lifecycle: submission, FIFO-per-source queuing, execution via
//! per-job-type adapters on a bounded worker pool, cooperative
//! cancellation, and statistics.

pub mod adapter;
pub mod orchestrator;

pub use adapter::{JobAdapter, StepError, StepOutcome, StepSpec};
pub use orchestrator::{CancelAck, CancelError, JobOrchestrator, SubmitError};
