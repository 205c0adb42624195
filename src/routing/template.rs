//! URL templates with named placeholders.
//!
//! # Responsibilities
//! - Parse path templates such as `clusters/{cluster}/rules/{rule_id}/like`
//! - Render them positionally (arity-checked) or from named parameters
//!
//! # Design Decisions
//! - Placeholder names match `[A-Za-z0-9_]+` and are unique per template
//! - Rendering never emits leftover `{...}` syntax: it either substitutes
//!   every placeholder or returns an error

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template `{template}` expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        template: String,
        expected: usize,
        actual: usize,
    },

    #[error("template `{template}` has no value for placeholder `{name}`")]
    MissingParameter { template: String, name: String },

    #[error("template `{template}` declares placeholder `{name}` more than once")]
    DuplicatePlaceholder { template: String, name: String },

    #[error("template `{template}` is malformed at byte {position}")]
    Malformed { template: String, position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UrlTemplate {
    /// Parse a template, rejecting malformed or repeated placeholders.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let malformed = |position| TemplateError::Malformed {
            template: template.to_string(),
            position,
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if !(c.is_ascii_alphanumeric() || c == '_') {
                            return Err(malformed(pos));
                        }
                        name.push(c);
                    }
                    if !closed || name.is_empty() {
                        return Err(malformed(pos));
                    }
                    let seen = parts
                        .iter()
                        .any(|p| matches!(p, Part::Placeholder(n) if *n == name));
                    if seen {
                        return Err(TemplateError::DuplicatePlaceholder {
                            template: template.to_string(),
                            name,
                        });
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Placeholder(name));
                }
                '}' => return Err(malformed(pos)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            parts,
        })
    }

    /// The template text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Placeholder(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Render by substituting positional arguments, first placeholder first.
    pub fn render_positional(&self, args: &[&dyn Display]) -> Result<String, TemplateError> {
        let expected = self.placeholders().count();
        if expected != args.len() {
            return Err(TemplateError::ArityMismatch {
                template: self.raw.clone(),
                expected,
                actual: args.len(),
            });
        }

        let mut args = args.iter();
        let mut out = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                // Arity was checked above.
                Part::Placeholder(_) => {
                    if let Some(arg) = args.next() {
                        out.push_str(&arg.to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Render by looking up each placeholder by name.
    pub fn render(&self, params: &PathParams) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(name) => {
                    let value = params.get(name).ok_or_else(|| TemplateError::MissingParameter {
                        template: self.raw.clone(),
                        name: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Path parameters bound by name, in the order they were extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = PathParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Build a URL to an endpoint: `prefix` followed by `template` with its
/// placeholders replaced by `args` in order of appearance.
pub fn make_url_to_endpoint(
    prefix: &str,
    template: &str,
    args: &[&dyn Display],
) -> Result<String, TemplateError> {
    let rendered = UrlTemplate::parse(template)?.render_positional(args)?;
    Ok(format!("{prefix}{rendered}"))
}
