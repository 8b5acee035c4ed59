//! Subtitle provider abstraction.
//!
//! This module provides the `ProviderClient` trait implemented by each
//! subtitle source, the `ErrorReporter` collaborator that receives provider
//! failures, and the OpenSubtitles REST backend.

mod opensubtitles;
mod reporter;
mod types;

pub use opensubtitles::OpenSubtitlesClient;
pub use reporter::TracingErrorReporter;
pub use types::*;
