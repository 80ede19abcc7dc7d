//! Target parsing and page link extraction.
//!
//! - [`Target`]: a validated album or listing URL with its start page
//! - [`LinkExtractor`]: turns rendered markup into [`LinkRecord`]s
//!
//! # Example
//!
//! ```
//! use v2dl_core::parser::{parse_targets, TargetKind};
//!
//! let result = parse_targets(["https://www.v2ph.com/album/a?page=2", "https://www.v2ph.com/tag/x"]);
//! assert_eq!(result.targets.len(), 1);
//! assert_eq!(result.targets[0].kind(), TargetKind::Album);
//! assert_eq!(result.targets[0].start_page(), 2);
//! assert_eq!(result.rejected.len(), 1);
//! ```

mod error;
mod links;
mod target;

pub use error::{MAX_URL_LENGTH, TargetError};
pub use links::{LinkExtractor, LinkRecord, MediaRef};
pub use target::{PAGE_PARAM, Target, TargetKind, strip_page_param};

use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of parsing a batch of target URLs.
#[derive(Debug, Clone, Default)]
pub struct TargetParseResult {
    /// Accepted targets, in input order, duplicates removed.
    pub targets: Vec<Target>,
    /// Inputs that could not be classified.
    pub rejected: Vec<TargetError>,
}

impl TargetParseResult {
    /// Returns true when nothing usable was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parses every input, keeping the good ones and collecting errors for the rest.
///
/// Blank inputs are ignored. Two inputs naming the same URL (after
/// normalization) produce one target.
pub fn parse_targets<I, S>(inputs: I) -> TargetParseResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = TargetParseResult::default();
    let mut seen = HashSet::new();

    for input in inputs {
        let input = input.as_ref();
        if input.trim().is_empty() {
            continue;
        }
        match Target::parse(input) {
            Ok(target) => {
                if seen.insert(target.url().as_str().to_string()) {
                    result.targets.push(target);
                } else {
                    debug!(url = %target, "duplicate target ignored");
                }
            }
            Err(e) => {
                warn!(input, error = %e, "rejecting target");
                result.rejected.push(e);
            }
        }
    }

    result
}
