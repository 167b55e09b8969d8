//! Outbound fetching and request pacing

pub mod http;
pub mod pacer;

pub use http::{FetchError, Fetcher};
pub use pacer::{Pacer, pause_between};
