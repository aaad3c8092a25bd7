pub mod filters;
pub mod sort;
pub mod tags;
pub mod visibility;

pub use filters::{DEFAULT_PER_PAGE, PostFilters};
pub use sort::{SortKey, SortOrder};
pub use tags::TagSelection;
pub use visibility::Visibility;
