//! Hierarchical names
//!
//! Names are sequences of segments joined by [`SEPARATOR`]. The directory
//! stores them in their joined form with a single leading separator
//! stripped, so `"/a/b"`, `"a/b"` and `CompositeName::parse("a/b")` all
//! address the same binding.

use std::fmt;
use std::str::FromStr;
use txharness_core::{Error, Result};

/// Segment separator
pub const SEPARATOR: &str = "/";

/// Anything that can address a directory entry
pub trait DirectoryName {
    /// The normalized directory key for this name
    fn to_key(&self) -> String;
}

impl DirectoryName for str {
    fn to_key(&self) -> String {
        self.strip_prefix(SEPARATOR).unwrap_or(self).to_string()
    }
}

impl DirectoryName for String {
    fn to_key(&self) -> String {
        self.as_str().to_key()
    }
}

impl DirectoryName for CompositeName {
    fn to_key(&self) -> String {
        self.to_string().to_key()
    }
}

/// A name made of ordered segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompositeName {
    segments: Vec<String>,
}

impl CompositeName {
    /// Create an empty name
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `name` on the separator.
    ///
    /// Trailing empty segments are dropped; an empty string is the empty name.
    pub fn parse(name: &str) -> Self {
        let mut segments: Vec<String> = name.split(SEPARATOR).map(str::to_string).collect();
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        Self { segments }
    }

    /// Build a name from segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the name has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// All segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first `count` segments
    pub fn prefix(&self, count: usize) -> CompositeName {
        let end = count.min(self.segments.len());
        Self::from_segments(self.segments[..end].iter().cloned())
    }

    /// The segments from `start` to the end
    pub fn suffix(&self, start: usize) -> CompositeName {
        let start = start.min(self.segments.len());
        Self::from_segments(self.segments[start..].iter().cloned())
    }

    /// Check if `other` is a leading run of this name's segments
    pub fn starts_with(&self, other: &CompositeName) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// Check if `other` is a trailing run of this name's segments
    pub fn ends_with(&self, other: &CompositeName) -> bool {
        self.segments.ends_with(&other.segments)
    }

    /// Append a segment
    pub fn add(&mut self, segment: impl Into<String>) -> &mut Self {
        self.segments.push(segment.into());
        self
    }

    /// Append all segments of `suffix`
    pub fn add_all(&mut self, suffix: &CompositeName) -> &mut Self {
        self.segments.extend(suffix.segments.iter().cloned());
        self
    }

    /// Insert a segment at `position`
    pub fn insert(&mut self, position: usize, segment: impl Into<String>) -> Result<&mut Self> {
        if position > self.segments.len() {
            return Err(Error::InvalidName {
                name: self.to_string(),
                reason: format!(
                    "position {} out of range for {} segments",
                    position,
                    self.segments.len()
                ),
            });
        }
        self.segments.insert(position, segment.into());
        Ok(self)
    }

    /// Remove the segment at `position`
    pub fn remove(&mut self, position: usize) -> Option<String> {
        if position < self.segments.len() {
            Some(self.segments.remove(position))
        } else {
            None
        }
    }

    /// `prefix` followed by this name
    pub fn compose(&self, prefix: &CompositeName) -> CompositeName {
        let mut composed = prefix.clone();
        composed.add_all(self);
        composed
    }
}

impl fmt::Display for CompositeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(SEPARATOR))
    }
}

impl FromStr for CompositeName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for CompositeName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Parses names relative to a root
#[derive(Debug, Clone)]
pub struct NameParser {
    root: CompositeName,
}

impl NameParser {
    /// Create a parser rooted at `root`
    pub fn new(root: &str) -> Self {
        Self {
            root: CompositeName::parse(root),
        }
    }

    /// The root every parsed name starts with
    pub fn root(&self) -> &CompositeName {
        &self.root
    }

    /// Parse `name` below the root
    pub fn parse(&self, name: &str) -> CompositeName {
        CompositeName::parse(name).compose(&self.root)
    }
}
