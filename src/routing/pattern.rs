//! Path pattern compilation and matching.
//!
//! A pattern is an ordered sequence of `/`-delimited segments, each either a
//! literal or a `{name}` placeholder. Matching walks pattern and path
//! segments pairwise: literals compare verbatim (case-sensitive), a
//! placeholder consumes the path segment into the [`ParamMap`] under its
//! name. Segment counts must agree — there is no backtracking and no
//! rest-of-path wildcard. Trailing slashes are trimmed before splitting.

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Pattern compilation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("pattern contains an empty segment")]
    EmptySegment,

    #[error("placeholder name must not be empty")]
    EmptyPlaceholder,

    #[error("duplicate placeholder name `{0}` in one pattern")]
    DuplicatePlaceholder(String),
}

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Named parameters extracted from a concrete path, in pattern order.
///
/// Lives for a single request; serializes as a JSON object for the host
/// callback payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, String)>,
}

impl ParamMap {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: String) {
        self.entries.push((name.to_string(), value));
    }
}

impl Serialize for ParamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a pattern string, validating segment shape and placeholder
    /// names.
    pub fn compile(text: &str) -> Result<Self, PatternError> {
        if !text.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let mut segments = Vec::new();
        let mut seen_params: Vec<&str> = Vec::new();

        for part in split_segments(text) {
            if part.is_empty() {
                return Err(PatternError::EmptySegment);
            }
            if let Some(name) = placeholder_name(part) {
                if name.is_empty() {
                    return Err(PatternError::EmptyPlaceholder);
                }
                if seen_params.contains(&name) {
                    return Err(PatternError::DuplicatePlaceholder(name.to_string()));
                }
                seen_params.push(name);
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: text.to_string(),
            segments,
        })
    }

    /// The pattern text as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern contains any placeholder segment.
    pub fn has_params(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(_)))
    }

    /// A key with placeholder names erased: two patterns with the same
    /// literal/placeholder shape share one structural key and are treated as
    /// duplicates by the route table.
    pub fn structural_key(&self) -> String {
        let mut key = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(lit) => key.push_str(lit),
                Segment::Param(_) => key.push_str("{}"),
            }
        }
        if key.is_empty() {
            key.push('/');
        }
        key
    }

    /// Match a concrete request path, extracting placeholder values.
    ///
    /// Placeholder values are percent-decoded; literal segments are compared
    /// against the raw path verbatim.
    pub fn match_path(&self, path: &str) -> Option<ParamMap> {
        let path_segments = split_segments(path);
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = ParamMap::default();
        for (segment, actual) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != actual {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = match urlencoding::decode(actual) {
                        Ok(decoded) => decoded.into_owned(),
                        // Undecodable bytes are taken verbatim
                        Err(_) => actual.to_string(),
                    };
                    params.insert(name, value);
                }
            }
        }
        Some(params)
    }
}

/// Trim trailing slashes from a path, preserving the bare root.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    let normalized = normalize_path(path);
    let body = normalized.strip_prefix('/').unwrap_or(normalized);
    // The root has zero segments; it must not be mistaken for one empty one.
    if body.is_empty() {
        Vec::new()
    } else {
        body.split('/').collect()
    }
}

fn placeholder_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}
