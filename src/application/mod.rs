pub mod ports;
pub mod services;

pub use services::{CatalogService, FeedService, FilterAggregator, ScrollTrigger};
