//! Build version model.
//!
//! A version is 2 to 4 non-negative integer components (major, minor,
//! optional build, optional revision). Ordering is component-wise, and a
//! missing component sorts below zero: `1.2 < 1.2.0 < 1.2.1`. Formatting
//! re-emits exactly the parsed component count, so parse/format round-trips.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("version must have 2 to 4 components, got {0}")]
    ComponentCount(usize),

    #[error("invalid version component '{0}'")]
    Component(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    pub fn new(components: Vec<u64>) -> Result<Self, VersionParseError> {
        if !(2..=4).contains(&components.len()) {
            return Err(VersionParseError::ComponentCount(components.len()));
        }
        Ok(Self { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Scans `/`-separated path segments and returns the first one that
    /// parses as a version. A versioned install lives in a directory named
    /// after its version, so the symlink target carries the installed
    /// version somewhere in its path.
    pub fn from_path(path: &str) -> Option<Self> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .find_map(|segment| segment.parse().ok())
    }

    /// Extracts a version from an arbitrary tag such as `v1.2.3`,
    /// `curl-8_16_0`, or `release-2.0.1-beta` by joining every digit run.
    /// Returns `None` unless that yields 2 to 4 components.
    pub fn parse_loose(tag: &str) -> Option<Self> {
        let mut components = Vec::new();
        let mut current = String::new();
        for c in tag.chars() {
            if c.is_ascii_digit() {
                current.push(c);
            } else if !current.is_empty() {
                components.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            components.push(current);
        }

        let parsed: Option<Vec<u64>> = components.iter().map(|c| c.parse().ok()).collect();
        Self::new(parsed?).ok()
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Vec<u64> = s
            .split('.')
            .map(|part| {
                // Reject signs and whitespace that u64::from_str would allow.
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    return Err(VersionParseError::Component(part.to_string()));
                }
                part.parse()
                    .map_err(|_| VersionParseError::Component(part.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Self::new(components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match (self.components.get(i), other.components.get(i)) {
                (Some(a), Some(b)) => match a.cmp(b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                },
                // Missing component sorts below a present one, even zero.
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (None, None) => unreachable!(),
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
