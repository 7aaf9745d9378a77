//! Remote tree paths
//!
//! A [`RemotePath`] is a `/`-separated list of validated segments. Segment
//! rules follow the realtime database key rules: non-empty, at most 768
//! bytes, no control characters and none of `. # $ [ ] /`.

use crate::error::RemoteError;
use std::fmt;
use std::str::FromStr;

/// Maximum encoded length of one segment
pub const MAX_SEGMENT_BYTES: usize = 768;

const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Validated path into the remote tree; the empty path is the root
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemotePath {
    segments: Vec<String>,
}

impl RemotePath {
    /// The root node
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path; leading, trailing and repeated slashes
    /// are ignored
    ///
    /// # Errors
    /// Returns error if any segment is invalid
    pub fn parse(path: &str) -> Result<Self, RemoteError> {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| validate_segment(s).map(|()| s.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Path of a direct child
    ///
    /// # Errors
    /// Returns error if `segment` is not a valid single segment
    pub fn child(&self, segment: &str) -> Result<Self, RemoteError> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Concatenate two paths
    #[must_use]
    pub fn join(&self, other: &RemotePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Parent path; the root has none
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if this is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if `self` equals `other` or lies beneath it
    #[inline]
    #[must_use]
    pub fn starts_with(&self, other: &RemotePath) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// Check if a change at one path can affect the other
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &RemotePath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// Path of `self` relative to `ancestor`
    #[must_use]
    pub fn strip_prefix(&self, ancestor: &RemotePath) -> Option<Self> {
        if !self.starts_with(ancestor) {
            return None;
        }
        Some(Self {
            segments: self.segments[ancestor.segments.len()..].to_vec(),
        })
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for RemotePath {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check one segment against the key rules
///
/// # Errors
/// Returns error describing the first rule the segment breaks
pub fn validate_segment(segment: &str) -> Result<(), RemoteError> {
    if segment.is_empty() {
        return Err(RemoteError::invalid_path(segment, "empty segment"));
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(RemoteError::invalid_path(segment, "segment too long"));
    }
    if segment.contains(FORBIDDEN) {
        return Err(RemoteError::invalid_path(
            segment,
            "contains one of . # $ [ ] /",
        ));
    }
    if segment.chars().any(char::is_control) {
        return Err(RemoteError::invalid_path(segment, "contains control character"));
    }
    Ok(())
}

/// Check if a string can be used as a single segment
#[inline]
#[must_use]
pub fn is_valid_segment(segment: &str) -> bool {
    validate_segment(segment).is_ok()
}
