pub mod history;
pub mod list;
pub mod suggest;

pub use history::GetHistoryQuery;
pub use list::ListMappingsQuery;
pub use suggest::SuggestMappingsQuery;
