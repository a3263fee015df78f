//! Outbound HTTP integrations.
//!
//! - [`client`]: [`RetryingHttpClient`], the rate-limited retrying transport
//!   every integration is built on
//! - [`news`]: headline service (`top-headlines`, `everything`)
//! - [`completion`]: completion service used for summaries

pub mod client;
pub mod completion;
pub mod news;

pub use client::{RequestOptions, ResponseValidator, RetryingHttpClient, ValidationPolicy};
pub use completion::{CompletionClient, CompletionRequest};
pub use news::{EverythingQuery, HeadlineQuery, NewsApiClient};
