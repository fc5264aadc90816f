//! Detection of backend error codes sent in place of a JSON body.
//!
//! The backend sometimes answers `200 OK` with a bare token such as `ABC123`,
//! the same token quoted, or a tiny object like `{"error":"ABC123"}`. The
//! detector runs an ordered list of matchers over the trimmed body; the first
//! one that fires decides the code.

use regex::Regex;

/// Built-in sentinel spellings, tried in order: (name, pattern, capture group).
/// Group 0 means "the whole match".
const BUILTIN_PATTERNS: &[(&str, &str, usize)] = &[
    ("bare", r"(?i)^[A-Z0-9]{5,8}$", 0),
    ("quoted", r#"(?i)^"[A-Z0-9]{5,8}"$"#, 0),
    (
        "keyed",
        r#"(?i)(?:^|[{,\s"])(?:code|error)"?\s*[:=]\s*"?([A-Z0-9]{5,8})"?\s*(?:[,}]|$)"#,
        1,
    ),
];

/// One way of spelling a backend error code.
#[derive(Debug, Clone)]
pub struct SentinelMatcher {
    pub name: &'static str,
    pattern: Regex,
    group: usize,
}

impl SentinelMatcher {
    /// Compile a matcher. `group` selects the capture holding the code.
    pub fn new(name: &'static str, pattern: &str, group: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            group,
        })
    }

    /// Extracted code, stripped of quotes, braces and brackets.
    pub fn extract(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let raw = caps.get(self.group).or_else(|| caps.get(0))?.as_str();
        let code: String = raw
            .chars()
            .filter(|c| !matches!(c, '"' | '{' | '}' | '[' | ']'))
            .collect();
        (!code.is_empty()).then_some(code)
    }
}

/// Ordered list of [`SentinelMatcher`]s.
#[derive(Debug, Clone)]
pub struct SentinelDetector {
    matchers: Vec<SentinelMatcher>,
}

impl Default for SentinelDetector {
    fn default() -> Self {
        let matchers = BUILTIN_PATTERNS
            .iter()
            .filter_map(|&(name, pattern, group)| {
                SentinelMatcher::new(name, pattern, group)
                    .map_err(|e| {
                        tracing::error!(matcher = name, error = %e, "invalid sentinel pattern")
                    })
                    .ok()
            })
            .collect();
        Self { matchers }
    }
}

impl SentinelDetector {
    pub fn new(matchers: Vec<SentinelMatcher>) -> Self {
        Self { matchers }
    }

    /// Append a matcher; it runs after every existing one.
    pub fn with_matcher(mut self, matcher: SentinelMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name).collect()
    }

    /// Detected error code, if any matcher fires on the trimmed body.
    pub fn detect(&self, body: &str) -> Option<String> {
        let text = body.trim();
        self.matchers.iter().find_map(|m| m.extract(text))
    }
}
