//! Identifier aggregator: reduces corroborated identifiers to the range the
//! extractor mines.

use std::ops::RangeInclusive;

use crate::error::MiningError;
use crate::pipeline::types::{CorroboratedIdentifier, IdentifierRange};

/// Inclusive range from the smallest to the largest identifier.
///
/// Duplicates do not matter. An empty input has no range and fails the run.
pub fn aggregate(identifiers: &[CorroboratedIdentifier]) -> Result<IdentifierRange, MiningError> {
    MinedIssues::from_identifiers(identifiers).map(|mined| mined.range())
}

/// Deduplicated, sorted issue numbers found in one run, with their range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedIssues {
    issues: Vec<u64>,
    range: IdentifierRange,
}

impl MinedIssues {
    pub fn from_identifiers(identifiers: &[CorroboratedIdentifier]) -> Result<Self, MiningError> {
        Self::from_numbers(identifiers.iter().map(|id| id.number))
    }

    pub fn from_numbers(numbers: impl IntoIterator<Item = u64>) -> Result<Self, MiningError> {
        let mut issues: Vec<u64> = numbers.into_iter().collect();
        issues.sort_unstable();
        issues.dedup();

        let (Some(&min), Some(&max)) = (issues.first(), issues.last()) else {
            return Err(MiningError::NoIdentifiers);
        };
        let range = IdentifierRange::new(min, max).ok_or(MiningError::NoIdentifiers)?;

        Ok(Self { issues, range })
    }

    pub fn range(&self) -> IdentifierRange {
        self.range
    }

    /// Every distinct issue number seen, ascending.
    pub fn issues(&self) -> &[u64] {
        &self.issues
    }

    /// Whether the range covers only issues that were actually seen.
    pub fn is_contiguous(&self) -> bool {
        self.range.span() == self.issues.len() as u64
    }

    /// Numbers inside the range that no message confirmed.
    pub fn unseen_in_range(&self) -> u64 {
        self.range.span() - self.issues.len() as u64
    }

    /// Maximal runs of consecutive issue numbers, e.g. `[3, 4, 5, 9]` gives
    /// `3..=5` and `9..=9`.
    pub fn runs(&self) -> Vec<RangeInclusive<u64>> {
        let mut runs = Vec::new();
        let mut iter = self.issues.iter().copied();
        let Some(first) = iter.next() else {
            return runs;
        };

        let (mut start, mut end) = (first, first);
        for n in iter {
            if n == end + 1 {
                end = n;
            } else {
                runs.push(start..=end);
                start = n;
                end = n;
            }
        }
        runs.push(start..=end);
        runs
    }
}
