pub mod cancel;
pub mod submit;

pub use cancel::CancelJobCommand;
pub use submit::{SubmitJobCommand, SubmitJobError};
