//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile a full route path (prefix + template) into segments
//! - Match a concrete request path segment by segment
//! - Extract placeholder values as named path parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive and exact; a trailing `/` is significant
//! - A placeholder spans exactly one non-empty segment other than `.`/`..`
//! - No regex, matching is O(segments)

use std::fmt;

use crate::routing::template::{PathParams, TemplateError, UrlTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a full path template. Placeholders must fill whole segments.
    pub fn compile(path: &str) -> Result<Self, TemplateError> {
        // Validates placeholder syntax and uniqueness.
        let template = UrlTemplate::parse(path)?;
        let mut segments = Vec::new();
        let mut offset = 0;

        for raw in path.split('/') {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.contains(['{', '}']) => Segment::Param(name.to_string()),
                _ if raw.contains(['{', '}']) => {
                    return Err(TemplateError::Malformed {
                        template: template.as_str().to_string(),
                        position: offset,
                    });
                }
                _ => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
            offset += raw.len() + 1;
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    /// The path as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Shape of the pattern with placeholder names erased.
    ///
    /// Two patterns with the same key match exactly the same set of paths.
    pub fn normalized(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.as_str(),
                Segment::Param(_) => "{}",
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Match a request path, returning the extracted parameters.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(text) if text == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() || is_dot_segment(part) => return None,
                Segment::Param(name) => params.insert(name.as_str(), part),
            }
        }

        // Request path has more segments than the pattern.
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

/// `.` or `..`, including percent-encoded forms such as `%2e%2E` that URL
/// joining also resolves away.
fn is_dot_segment(part: &str) -> bool {
    let decoded = part.to_ascii_lowercase().replace("%2e", ".");
    matches!(decoded.as_str(), "." | "..")
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::compile("/api/v1/groups").unwrap();
        assert!(pattern.match_path("/api/v1/groups").is_some());
        assert!(pattern.match_path("/api/v1/groups/").is_none());
        assert!(pattern.match_path("/api/v1/Groups").is_none());
        assert!(pattern.match_path("/api/v1").is_none());
    }

    #[test]
    fn test_trailing_slash_root() {
        let pattern = PathPattern::compile("/api/v1/").unwrap();
        assert!(pattern.match_path("/api/v1/").is_some());
        assert!(pattern.match_path("/api/v1").is_none());
        assert!(pattern.match_path("/api/v1/x").is_none());
    }

    #[test]
    fn test_param_extraction() {
        let pattern = PathPattern::compile("/api/v1/clusters/{cluster}/rules/{rule_id}/like").unwrap();
        let params = pattern.match_path("/api/v1/clusters/c1/rules/r.1/like").unwrap();
        assert_eq!(params.get("cluster"), Some("c1"));
        assert_eq!(params.get("rule_id"), Some("r.1"));
        assert_eq!(params.len(), 2);

        assert!(pattern.match_path("/api/v1/clusters//rules/r1/like").is_none());
        assert!(pattern.match_path("/api/v1/clusters/../rules/r1/like").is_none());
        assert!(pattern.match_path("/api/v1/clusters/c1/rules/r1/dislike").is_none());
    }

    #[test]
    fn test_encoded_dot_segments_rejected() {
        let pattern = PathPattern::compile("/api/v1/report/{organization}/{cluster}").unwrap();
        for dots in ["%2e%2e", "%2E%2e", ".%2e", "%2E.", "%2e", "%2E"] {
            let path = format!("/api/v1/report/{dots}/organizations");
            assert!(pattern.match_path(&path).is_none(), "{path} matched");
        }
        // Dots inside a value are fine.
        let params = pattern.match_path("/api/v1/report/%2e%2e%2e/c.1").unwrap();
        assert_eq!(params.get("organization"), Some("%2e%2e%2e"));
        assert_eq!(params.get("cluster"), Some("c.1"));
    }

    #[test]
    fn test_normalized_erases_names() {
        let a = PathPattern::compile("/api/v1/clusters/{cluster}").unwrap();
        let b = PathPattern::compile("/api/v1/clusters/{clusters}").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(a.normalized(), "/api/v1/clusters/{}");
    }

    #[test]
    fn test_partial_segment_placeholder_rejected() {
        assert!(matches!(
            PathPattern::compile("/api/v1/report-{id}"),
            Err(TemplateError::Malformed { .. })
        ));
    }
}
