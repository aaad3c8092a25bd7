pub mod post;

pub use post::{PopularTag, Post};
