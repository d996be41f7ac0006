pub mod apply_fix;

pub use apply_fix::{ApplyFixCommand, ApplyFixError};
