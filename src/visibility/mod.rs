mod cache;
mod pipeline;
mod service;

pub use cache::DEFAULT_TTL;
pub use pipeline::{RangeQuery, Visibility, VisibilitySource};
pub use service::{ServiceError, VisibilityService};
