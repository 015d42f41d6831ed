//! Route pattern compilation and matching.
//!
//! A pattern is split on `/` into literal segments, `:name` parameters and
//! an optional trailing `*` wildcard. Matching is a hand-written segment
//! walk rather than a compiled regex; the grammar is small enough that the
//! walk is both simpler and faster.

use std::fmt;

use crate::error::Error;
use crate::Result;

/// Collapses runs of `/` and strips one leading and trailing `/`.
///
/// The result is the canonical segment form: `""` for the root, otherwise
/// `a/b/c`. Idempotent, so matching a path and matching its normalized
/// form agree.
pub(crate) fn clean(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = true;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push('/');
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    if out.ends_with('/') {
        out.pop();
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

impl Pattern {
    /// Compiles a pattern.
    ///
    /// Parameter names must match `[A-Za-z0-9_-]+`, must be unique within
    /// the pattern, and must not both start and end with `__` (reserved).
    /// A `*` wildcard must be the final segment.
    pub fn compile(pattern: &str) -> Result<Pattern> {
        let cleaned = clean(pattern);
        let mut segments = Vec::new();
        let mut wildcard = false;
        if !cleaned.is_empty() {
            for raw in cleaned.split('/') {
                if wildcard {
                    return Err(Error::new_user_wildcard_position());
                }
                if raw == "*" {
                    wildcard = true;
                } else if let Some(name) = raw.strip_prefix(':') {
                    if name.is_empty()
                        || !name
                            .bytes()
                            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
                    {
                        return Err(Error::new_user_invalid_param());
                    }
                    if name.starts_with("__") && name.ends_with("__") {
                        return Err(Error::new_user_reserved_param());
                    }
                    if segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name)) {
                        return Err(Error::new_user_duplicate_param());
                    }
                    segments.push(Segment::Param(name.to_owned()));
                } else {
                    segments.push(Segment::Literal(raw.to_owned()));
                }
            }
        }
        Ok(Pattern {
            source: pattern.to_owned(),
            segments,
            wildcard,
        })
    }

    /// Tests a path against the pattern.
    ///
    /// The input is normalized the same way the pattern was; a wildcard
    /// captures the remaining cleaned text verbatim as the remainder.
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let cleaned = clean(path);
        let mut rest = cleaned.as_str();
        let mut params = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            if rest.is_empty() {
                return None;
            }
            let (part, tail) = match rest.find('/') {
                Some(at) => (&rest[..at], &rest[at + 1..]),
                None => (rest, ""),
            };
            match segment {
                Segment::Literal(lit) => {
                    if part != lit {
                        return None;
                    }
                }
                Segment::Param(name) => params.push((name.clone(), part.to_owned())),
            }
            rest = tail;
        }
        if self.wildcard {
            Some(PathMatch {
                params,
                remainder: Some(rest.to_owned()),
            })
        } else if rest.is_empty() {
            Some(PathMatch {
                params,
                remainder: None,
            })
        } else {
            None
        }
    }

    /// Whether the pattern ends in a wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The captures of a successful pattern match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathMatch {
    params: Vec<(String, String)>,
    remainder: Option<String>,
}

impl PathMatch {
    /// The captured value of a named parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All captures in pattern order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The suffix consumed by a trailing wildcard, if the pattern had one.
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }
}
