pub mod feed_gateway;
pub mod visibility;

pub use feed_gateway::{FeedGateway, FeedPage, PageInfo};
pub use visibility::{ObserveOptions, SentinelId, VisibilityNotifier};
