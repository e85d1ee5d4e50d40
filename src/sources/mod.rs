//! Source readers and the shared line parser
//!
//! Every reader turns one origin of channel data into a [`SourceMap`]:
//!
//! - [`file::FileSourceReader`] for the local list and the bundled template
//! - [`subscription::SubscriptionFetcher`] for remote subscription documents
//!
//! Readers never fail the run. Missing files, failed fetches and malformed
//! lines all degrade to an empty (or partial) map plus log output.
//!
//! [`SourceMap`]: crate::models::SourceMap

pub mod file;
pub mod parser;
pub mod subscription;

pub use file::FileSourceReader;
pub use parser::{Dialect, ParseOutcome, is_candidate_url, parse, parse_with};
pub use subscription::{SubscriptionFetcher, SubscriptionReport};
