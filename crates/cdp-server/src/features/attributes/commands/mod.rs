pub mod define;

pub use define::{DefineAttributeCommand, DefineAttributeError};
