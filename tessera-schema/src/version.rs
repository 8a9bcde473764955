//! Semantic versions (`MAJOR.MINOR.PATCH`) for schema history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing or incrementing a version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Input is not three dot-separated decimal components.
    #[error("invalid version {0:?}: expected MAJOR.MINOR.PATCH")]
    Parse(String),

    /// A component does not fit in 64 bits.
    #[error("version component overflow in {0:?}")]
    Overflow(String),
}

/// A `(major, minor, patch)` triple.
///
/// Field order matters: the derived `Ord` compares major, then minor, then
/// patch, numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemVer {
    major: u64,
    minor: u64,
    patch: u64,
}

impl SemVer {
    /// Version assigned to the first version of a schema.
    pub const INITIAL: SemVer = SemVer::new(1, 0, 0);

    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.patch
    }

    /// Parses `^\d+\.\d+\.\d+$`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let mut parts = input.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionError::Parse(input.to_string()));
        };
        Ok(Self {
            major: component(input, major)?,
            minor: component(input, minor)?,
            patch: component(input, patch)?,
        })
    }

    /// Same major and minor, patch + 1.
    pub fn next_patch(&self) -> Result<Self, VersionError> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| VersionError::Overflow(self.to_string()))?;
        Ok(Self { patch, ..*self })
    }

    /// Version for a new schema version when the caller did not pick one:
    /// [`SemVer::INITIAL`] with no history, otherwise the patch after the
    /// highest existing version (soft-deleted versions included by the caller).
    pub fn resolve_next<'a, I>(existing: I) -> Result<Self, VersionError>
    where
        I: IntoIterator<Item = &'a SemVer>,
    {
        match existing.into_iter().max() {
            Some(max) => max.next_patch(),
            None => Ok(Self::INITIAL),
        }
    }
}

fn component(input: &str, part: &str) -> Result<u64, VersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::Parse(input.to_string()));
    }
    part.parse::<u64>()
        .map_err(|_| VersionError::Overflow(input.to_string()))
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SemVer {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SemVer> for String {
    fn from(version: SemVer) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zeros_normalize() {
        let v = SemVer::parse("01.002.0003").unwrap();
        assert_eq!(v, SemVer::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn patch_overflow_is_an_error() {
        let v = SemVer::new(1, 0, u64::MAX);
        assert!(matches!(v.next_patch(), Err(VersionError::Overflow(_))));
    }

    #[test]
    fn huge_component_is_overflow() {
        let err = SemVer::parse("1.0.99999999999999999999999").unwrap_err();
        assert!(matches!(err, VersionError::Overflow(_)));
    }
}
