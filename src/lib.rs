//! Themed headline fetching and summarization.
//!
//! - [`api`]: retrying, rate-limited HTTP transport and the headline/completion clients
//! - [`tasks`]: background task registry and bounded concurrent gather
//! - [`db`]: SQLite storage of articles and summaries
//! - [`pipeline`]: the end-to-end [`pipeline::NewsFetcher`]
//! - [`config`], [`models`], [`outputs`], [`utils`]: supporting pieces

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod tasks;
pub mod utils;

pub use error::{Error, Result};
