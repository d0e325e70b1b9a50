//! ABI compatibility between compiled grammars and the linked runtime.
//!
//! Every generated parser records the language ABI it was generated for. The
//! runtime accepts a contiguous band of versions, reported by
//! [`tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION`] and
//! [`tree_sitter::LANGUAGE_VERSION`].

use std::fmt;
use std::ops::RangeInclusive;

/// The inclusive band of ABI versions a loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiRange {
    min: usize,
    max: usize,
}

impl AbiRange {
    /// Creates a range accepting `min..=max`.
    ///
    /// The bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// The range accepted by the linked tree-sitter runtime.
    #[must_use]
    pub fn runtime() -> Self {
        Self::new(
            tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION,
            tree_sitter::LANGUAGE_VERSION,
        )
    }

    /// Lowest accepted version.
    #[must_use]
    pub fn min(self) -> usize {
        self.min
    }

    /// Highest accepted version.
    #[must_use]
    pub fn max(self) -> usize {
        self.max
    }

    /// Returns `true` if `version` lies within the range.
    #[must_use]
    pub fn contains(self, version: usize) -> bool {
        (self.min..=self.max).contains(&version)
    }
}

impl Default for AbiRange {
    fn default() -> Self {
        Self::runtime()
    }
}

impl From<RangeInclusive<usize>> for AbiRange {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

impl fmt::Display for AbiRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Reads the ABI marker (`#define LANGUAGE_VERSION N`) from generated `parser.c` source.
///
/// Returns `None` if the marker is absent or not a number.
#[must_use]
pub fn scan_parser_source(source: &str) -> Option<usize> {
    source.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("#define")?;
        let value = rest.trim_start().strip_prefix("LANGUAGE_VERSION")?;
        // Guard against longer macro names sharing the prefix.
        if !value.starts_with(char::is_whitespace) {
            return None;
        }
        value.trim().parse().ok()
    })
}
