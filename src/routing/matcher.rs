//! Route pattern compilation.
//!
//! # Responsibilities
//! - Compile literal and `:param` patterns to anchored regular expressions
//! - Recognize the single wildcard pattern `*`
//!
//! # Design Decisions
//! - Full-string anchoring: a pattern matches the whole path or not at all
//! - One capture group per `:param` segment; `/` never matches inside a
//!   parameter
//! - `*` is only legal as the entire pattern

use regex::Regex;
use thiserror::Error;

/// Errors raised while compiling a route pattern.
#[derive(Debug, Error)]
pub enum RoutePatternError {
    #[error("empty route pattern")]
    Empty,

    #[error("route pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("invalid parameter segment `{segment}` in `{pattern}`")]
    InvalidParam { pattern: String, segment: String },

    #[error("`*` must be the entire pattern, got `{0}`")]
    EmbeddedWildcard(String),

    #[error("pattern `{pattern}` failed to compile: {source}")]
    Compile {
        pattern: String,
        source: regex::Error,
    },
}

/// A compiled pattern ready for matching.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Literal/parametric pattern with the names of its capture groups.
    Specific { regex: Regex, params: Vec<String> },
    /// The catch-all fallback.
    Wildcard,
}

/// Compile one declared pattern.
pub fn compile_pattern(pattern: &str) -> Result<CompiledPattern, RoutePatternError> {
    if pattern.is_empty() {
        return Err(RoutePatternError::Empty);
    }
    if pattern == "*" {
        return Ok(CompiledPattern::Wildcard);
    }
    if !pattern.starts_with('/') {
        return Err(RoutePatternError::MissingLeadingSlash(pattern.to_string()));
    }

    let mut source = String::from("^");
    let mut params = Vec::new();
    for segment in pattern.split('/').skip(1) {
        source.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(RoutePatternError::InvalidParam {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                });
            }
            params.push(name.to_string());
            source.push_str("([^/]+)");
        } else if segment.contains('*') {
            return Err(RoutePatternError::EmbeddedWildcard(pattern.to_string()));
        } else {
            source.push_str(&regex::escape(segment));
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|source| RoutePatternError::Compile {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(CompiledPattern::Specific { regex, params })
}

impl CompiledPattern {
    /// Extracted parameters when `path` matches, `None` otherwise.
    /// The wildcard matches any path with no parameters.
    pub fn capture(&self, path: &str) -> Option<Vec<(String, String)>> {
        match self {
            CompiledPattern::Wildcard => Some(Vec::new()),
            CompiledPattern::Specific { regex, params } => {
                let captures = regex.captures(path)?;
                Some(
                    params
                        .iter()
                        .zip(captures.iter().skip(1))
                        .filter_map(|(name, capture)| {
                            capture.map(|c| (name.clone(), c.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }
}
