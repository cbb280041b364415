//! Path template matching.
//!
//! # Responsibilities
//! - Compile a path template into segments once, at startup
//! - Match a request path against the compiled template
//! - Extract named parameters as raw (undecoded) substrings
//!
//! # Template Syntax
//! ```text
//! /users            literal segment (case-sensitive)
//! /users/:id        one non-empty segment, captured as `id`
//! /posts/:slug?     optional segment
//! /files/:rest*     zero or more trailing segments, joined with '/'
//! /files/:rest+     one or more trailing segments
//! /static/*         unnamed wildcard, captured under "0", "1", ...
//! /*                catch-all, including `/` itself
//! ```
//!
//! `*` is only valid as a whole segment; `/assets/*.js` is rejected.
//!
//! # Design Decisions
//! - No regex: segments are compared directly
//! - Trailing slashes are significant (`/a` does not match `/a/`)
//! - Greedy with backtracking for variable-length segments

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

/// Parameters extracted from a matched path.
pub type Params = BTreeMap<String, String>;

/// Errors raised while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path template `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("invalid parameter name `{name}` in `{template}`")]
    InvalidParamName { template: String, name: String },

    #[error("duplicate parameter `{name}` in `{template}`")]
    DuplicateParam { template: String, name: String },

    #[error("`*` must be a whole segment, found `{segment}` in `{template}`")]
    EmbeddedWildcard { template: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
    ZeroOrMore(String),
    OneOrMore(String),
    /// `*`; matches one or more segments, the first of which may be empty.
    Wildcard(String),
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a template such as `/users/:id`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(template.to_string()))?;

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut wildcards = 0usize;

        for raw in split_segments(rest) {
            let segment = if raw == "*" {
                let name = wildcards.to_string();
                wildcards += 1;
                Segment::Wildcard(name)
            } else if let Some(spec) = raw.strip_prefix(':') {
                let (name, ctor): (&str, fn(String) -> Segment) =
                    if let Some(n) = spec.strip_suffix('?') {
                        (n, Segment::Optional)
                    } else if let Some(n) = spec.strip_suffix('*') {
                        (n, Segment::ZeroOrMore)
                    } else if let Some(n) = spec.strip_suffix('+') {
                        (n, Segment::OneOrMore)
                    } else {
                        (spec, Segment::Param)
                    };

                if !is_param_name(name) {
                    return Err(PatternError::InvalidParamName {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
                if !seen.insert(name.to_string()) {
                    return Err(PatternError::DuplicateParam {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
                ctor(name.to_string())
            } else if raw.contains('*') {
                return Err(PatternError::EmbeddedWildcard {
                    template: template.to_string(),
                    segment: raw.to_string(),
                });
            } else {
                Segment::Literal(raw.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match a URL path (no query string). Returns the captured parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = split_segments(rest).collect();

        self.match_parts(&parts).or_else(|| {
            // `/` also reads as one empty segment, so `/*` captures "".
            if rest.is_empty() {
                self.match_parts(&[""])
            } else {
                None
            }
        })
    }

    fn match_parts(&self, parts: &[&str]) -> Option<Params> {
        let mut captured = Vec::new();
        if match_segments(&self.segments, parts, &mut captured) {
            Some(captured.into_iter().collect())
        } else {
            None
        }
    }
}

/// `""` yields no segments so that `/` compiles to an empty pattern.
fn split_segments(rest: &str) -> impl Iterator<Item = &str> {
    let mut iter = rest.split('/');
    if rest.is_empty() {
        iter.next();
    }
    iter
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn match_segments(
    segments: &[Segment],
    parts: &[&str],
    captured: &mut Vec<(String, String)>,
) -> bool {
    let Some((segment, remaining)) = segments.split_first() else {
        return parts.is_empty();
    };

    match segment {
        Segment::Literal(lit) => match parts.split_first() {
            Some((part, rest)) if part == lit => match_segments(remaining, rest, captured),
            _ => false,
        },
        Segment::Param(name) => match parts.split_first() {
            Some((part, rest)) if !part.is_empty() => {
                try_capture(name, part.to_string(), remaining, rest, captured)
            }
            _ => false,
        },
        Segment::Optional(name) => {
            if let Some((part, rest)) = parts.split_first() {
                if !part.is_empty()
                    && try_capture(name, part.to_string(), remaining, rest, captured)
                {
                    return true;
                }
            }
            match_segments(remaining, parts, captured)
        }
        Segment::ZeroOrMore(name) => match_span(name, 0, false, remaining, parts, captured),
        Segment::OneOrMore(name) => match_span(name, 1, false, remaining, parts, captured),
        Segment::Wildcard(name) => match_span(name, 1, true, remaining, parts, captured),
    }
}

/// Greedily consume `min..=parts.len()` segments, backing off until the rest matches.
fn match_span(
    name: &str,
    min: usize,
    allow_empty: bool,
    remaining: &[Segment],
    parts: &[&str],
    captured: &mut Vec<(String, String)>,
) -> bool {
    if parts.len() < min {
        return false;
    }
    for take in (min..=parts.len()).rev() {
        let (span, rest) = parts.split_at(take);
        if !allow_empty && span.iter().any(|p| p.is_empty()) {
            continue;
        }
        if take == 0 {
            // Nothing captured; the name stays absent.
            if match_segments(remaining, rest, captured) {
                return true;
            }
            continue;
        }
        if try_capture(name, span.join("/"), remaining, rest, captured) {
            return true;
        }
    }
    false
}

fn try_capture(
    name: &str,
    value: String,
    remaining: &[Segment],
    rest: &[&str],
    captured: &mut Vec<(String, String)>,
) -> bool {
    let mark = captured.len();
    captured.push((name.to_string(), value));
    if match_segments(remaining, rest, captured) {
        true
    } else {
        captured.truncate(mark);
        false
    }
}
