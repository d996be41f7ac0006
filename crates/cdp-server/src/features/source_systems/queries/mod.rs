pub mod get;
pub mod list;
pub mod sample;

pub use get::{GetSourceSystemError, GetSourceSystemQuery};
pub use list::ListSourceSystemsQuery;
pub use sample::{SampleSourceError, SampleSourceQuery};
