pub mod catalog_service;
pub mod feed_service;
pub mod filter_service;
pub mod scroll_service;

pub use catalog_service::CatalogService;
pub use feed_service::{FeedService, FeedView, LoadPhase, SharePayload};
pub use filter_service::FilterAggregator;
pub use scroll_service::{FetchMore, ScrollTrigger};
