pub mod deactivate;
pub mod register;
pub mod scan;

pub use deactivate::DeactivateSourceCommand;
pub use register::{RegisterSourceCommand, RegisterSourceError};
pub use scan::{ScanSourceCommand, ScanSourceError, ScanSourceResponse};
