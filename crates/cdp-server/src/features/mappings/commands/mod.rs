pub mod create;
pub mod reset;
pub mod validate;

pub use create::{CreateMappingCommand, CreateMappingError};
pub use reset::ResetMappingCommand;
pub use validate::{ValidateMappingCommand, ValidateMappingResponse};
