pub mod entities;
pub mod value_objects;

pub use entities::{PopularTag, Post};
pub use value_objects::{PostFilters, SortKey, SortOrder, TagSelection, Visibility};
