//! Rule system for crawlbox
//!
//! A rule tells the engine how to fetch requests bound to its name and what to
//! do with the response.
//!
//! ## Key Components
//!
//! - [`Rule`] - Timeout, optional pre-request hook and parse callback
//! - [`RuleRegistry`] - Case-insensitive name → rule mapping
//! - [`ParseHandler`] / [`RequestHook`] - Callback traits, implemented for closures
//! - [`Request`] - A queued fetch carrying a typed [`Params`] bag
//! - [`FetchContext`] - What a parse callback gets to look at
//!
//! ## Example
//!
//! ```rust,ignore
//! use crawlbox::rules::{Request, Rule};
//! use scraper::Selector;
//!
//! let links = Selector::parse("a.item").unwrap();
//! engine.add_rule("default", Rule::parse(move |ctx| {
//!     for link in ctx.document().select(&links) {
//!         if let Some(href) = link.value().attr("href") {
//!             ctx.enqueue(Request::new(href).with_rule("leaf"));
//!         }
//!     }
//!     true
//! }));
//! ```

mod registry;
mod traits;
pub(crate) mod types;

pub use registry::{DEFAULT_RULE, RegistryError, Rule, RuleRegistry, normalize_rule_name};
pub use traits::{ParseHandler, RequestHook};
pub use types::{FetchContext, FetchResponse, OutgoingRequest, Params, Request};
