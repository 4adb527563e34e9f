//! # Field Paths
//!
//! Form fields are addressed with dotted paths: `director.name` walks into
//! the `director` sub-form, `actors.1.name` walks into the second element of
//! the `actors` list. Segments are kept as strings; whether a segment is a
//! key or an index is decided by the shape of the node it is applied to.
//!
//! A segment that itself contains a dot is split further, so
//! `FieldPath::from(vec!["a.b", "c"])` and `FieldPath::parse("a.b.c")` are
//! the same path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted path into a form state. The empty path addresses the node itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted path. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        push_split(&mut segments, path);
        Self(segments)
    }

    /// Build a path from pre-split segments, splitting any embedded dots.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for segment in segments {
            push_split(&mut out, segment.as_ref());
        }
        Self(out)
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Alias of [`FieldPath::is_root`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment and the remaining path.
    pub fn split_first(&self) -> Option<(&str, FieldPath)> {
        let (head, rest) = self.0.split_first()?;
        Some((head.as_str(), FieldPath(rest.to_vec())))
    }

    /// The path of the owning node and the final segment.
    pub fn split_last(&self) -> Option<(FieldPath, &str)> {
        let (last, init) = self.0.split_last()?;
        Some((FieldPath(init.to_vec()), last.as_str()))
    }

    /// A new path with `other` appended.
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        FieldPath(segments)
    }

    /// A new path with one more segment (split on dots).
    pub fn child(&self, segment: &str) -> FieldPath {
        let mut segments = self.0.clone();
        push_split(&mut segments, segment);
        FieldPath(segments)
    }
}

fn push_split(out: &mut Vec<String>, raw: &str) {
    out.extend(
        raw.split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for FieldPath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<Vec<&str>> for FieldPath {
    fn from(segments: Vec<&str>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0.join(".")
    }
}
