pub mod dto;
pub mod handlers;

pub use dto::{ApiResponse, FeedQueryRequest, FeedSnapshot};
pub use handlers::FeedHandler;
