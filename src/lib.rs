pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod humanize;
pub mod observability;
pub mod queue;
pub mod rules;
pub mod sink;

pub use engine::{Engine, EngineState, FlushSummary};
pub use error::CrawlError;
pub use rules::{FetchContext, Params, Request, Rule};
pub use sink::{FlushReport, FnSink, LogSink, Sink};
