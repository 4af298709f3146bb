//! Ordered pattern-based redaction of credentials and PII.
//!
//! Patterns run in declaration order, each one over the output of the
//! previous. Every match becomes [`SENTINEL`], which none of the patterns
//! match, so redaction is idempotent.
//!
//! This is a defense-in-depth filter. It will not catch every secret.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Replacement text for every redacted match.
pub const SENTINEL: &str = "[REDACTED]";

/// Built-in patterns as `(name, expression)`, in application order.
pub const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    (
        "credential_pair",
        r#"(?i)[a-z0-9_.-]*(?:password|passwd|secret|token|api[_-]?key|private[_-]?key)[a-z0-9_.-]*["']?[ \t]*[:=][ \t]*(?:bearer[ \t]+)?(?:"[^"\n]*"|'[^'\n]*'|[^\s,;]+)"#,
    ),
    (
        "cloud_access_key_id",
        r"\b(?:AKIA|ASIA|AGPA|AIDA|AROA|ANPA|ANVA|AIPA)[0-9A-Z]{16}\b",
    ),
    (
        "cloud_secret_key",
        r"(?i)aws_?secret_?access_?key[ \t]*[:=][ \t]*[A-Za-z0-9/+=]{40}",
    ),
    (
        "labelled_opaque_key",
        r"(?i)\b(?:key|credential|auth)[ \t]*[:=][ \t]*[A-Za-z0-9/+_=-]{20,}",
    ),
    (
        "email",
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
    ),
    (
        "payment_card",
        r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b",
    ),
    ("government_id", r"\b\d{3}-\d{2}-\d{4}\b"),
    (
        "pem_private_key_block",
        r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
    ),
    (
        "pem_private_key_header",
        r"-----BEGIN [A-Z ]*PRIVATE KEY-----",
    ),
    (
        "bearer_token",
        r"(?i)\bbearer[ \t]+[A-Za-z0-9._~+/=-]+",
    ),
    (
        "vendor_token",
        r"\b(?:gh[pousr]_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{22,}|glpat-[A-Za-z0-9_-]{20}|xox[abprs]-[A-Za-z0-9-]{10,}|sk-[A-Za-z0-9]{20,})\b",
    ),
    (
        "sensitive_export",
        r"(?i)\bexport[ \t]+[a-z0-9_]*(?:password|secret|token|key|credential)[a-z0-9_]*=[^\s]+",
    ),
];

static DEFAULT_REDACTOR: LazyLock<Redactor> = LazyLock::new(Redactor::new);

/// A compiled, named redaction pattern.
#[derive(Debug, Clone)]
pub struct RedactionPattern {
    pub name: String,
    regex: Regex,
}

impl RedactionPattern {
    /// Compile a pattern. Returns `None` and logs a warning if it is malformed.
    pub fn compile(name: &str, expression: &str) -> Option<Self> {
        match Regex::new(expression) {
            Ok(regex) => Some(Self {
                name: name.to_string(),
                regex,
            }),
            Err(e) => {
                warn!(pattern = %name, error = %e, "skipping malformed redaction pattern");
                None
            }
        }
    }
}

/// Outcome of [`Redactor::redact_with_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionReport {
    pub text: String,
    pub redactions_applied: usize,
    pub patterns_matched: Vec<String>,
}

/// An ordered list of redaction patterns.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<RedactionPattern>,
}

impl Redactor {
    /// Redactor with the built-in pattern set.
    pub fn new() -> Self {
        Self::from_patterns(BUILTIN_PATTERNS.iter().copied())
    }

    /// Build from `(name, expression)` pairs. Malformed expressions are skipped.
    pub fn from_patterns<'a, I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|(name, expr)| RedactionPattern::compile(name, expr))
            .collect();
        Self { patterns }
    }

    /// Names of the patterns that compiled, in application order.
    pub fn pattern_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// Number of active patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Replace every sensitive-looking substring of `text` with [`SENTINEL`].
    pub fn redact(&self, text: &str) -> String {
        self.redact_with_report(text).text
    }

    /// Like [`Redactor::redact`], also counting replacements per pattern.
    pub fn redact_with_report(&self, text: &str) -> RedactionReport {
        let mut result = text.to_string();
        let mut count = 0;
        let mut matched = Vec::new();

        for pattern in &self.patterns {
            let hits = pattern.regex.find_iter(&result).count();
            if hits > 0 {
                result = pattern
                    .regex
                    .replace_all(&result, NoExpand(SENTINEL))
                    .into_owned();
                count += hits;
                matched.push(pattern.name.clone());
            }
        }

        RedactionReport {
            text: result,
            redactions_applied: count,
            patterns_matched: matched,
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

/// Redact `text` with the built-in pattern set.
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}
