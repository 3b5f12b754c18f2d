//! Results of best-effort operations.
//!
//! A [`Degraded`] always carries a usable value. Sub-steps that failed are
//! recorded as human-readable issues next to it instead of failing the whole
//! operation, so the caller can still render something and log what was lost.

use serde::Serialize;

/// A value produced by a best-effort operation, plus whatever went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degraded<T> {
    /// The (possibly partial) result.
    pub value: T,
    /// Failures that were tolerated while producing `value`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl<T> Degraded<T> {
    /// A result with nothing lost.
    pub const fn complete(value: T) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    /// A result carrying a single issue.
    pub fn with_issue(value: T, issue: impl Into<String>) -> Self {
        Self {
            value,
            issues: vec![issue.into()],
        }
    }

    /// Record a tolerated failure.
    pub fn push_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    /// Returns `true` if anything was lost.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Transform the value, keeping the issues.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Degraded<U> {
        Degraded {
            value: f(self.value),
            issues: self.issues,
        }
    }

    /// Split into value and issues.
    pub fn into_parts(self) -> (T, Vec<String>) {
        (self.value, self.issues)
    }

    /// Drop the issues.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Default> Default for Degraded<T> {
    fn default() -> Self {
        Self::complete(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_is_not_degraded() {
        let d = Degraded::complete(3);
        assert!(!d.is_degraded());
        assert_eq!(d.into_value(), 3);
    }

    #[test]
    fn test_issues_survive_map() {
        let mut d = Degraded::with_issue(vec![1, 2], "product lookup failed");
        d.push_issue("conversion failed");
        let mapped = d.map(|v| v.len());
        assert!(mapped.is_degraded());
        let (value, issues) = mapped.into_parts();
        assert_eq!(value, 2);
        assert_eq!(issues, ["product lookup failed", "conversion failed"]);
    }

    #[test]
    fn test_serializes_without_empty_issues() {
        let json = serde_json::to_value(Degraded::complete("ok")).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "value": "ok" }));
    }
}
