//! Report writers.
//!
//! # Submodules
//!
//! - [`report`]: plain-text summary report (`Title: …\nSummary: …` blocks)
//! - [`json`]: the full [`PipelineReport`](crate::models::PipelineReport) as
//!   pretty-printed JSON
//!
//! # Output Structure
//!
//! ```text
//! news_summaries.txt
//! ├── Title: <article 1>
//! │   Summary: <summary 1>
//! │
//! └── Title: <article 2>
//!     Summary: <summary 2>
//! ```

pub mod json;
pub mod report;
