//! Property-name redaction rules
//!
//! A rule is either a literal name (compared case-insensitively) or a regular
//! expression (compiled on first use, case-insensitive, cached for the life of
//! the rule). A rule set matches when any of its rules matches.

use super::properties::eq_ignore_case;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::OnceLock;

/// Replacement written in place of a redacted value
pub const REDACTED_MARKER: &str = "***REDACTED***";

/// How a rule's pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    Literal,
    Regex,
}

pub struct RedactionRule {
    pattern: String,
    mode: RuleMode,
    compiled: OnceLock<Option<Regex>>,
}

impl RedactionRule {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::with_mode(pattern, RuleMode::Literal)
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::with_mode(pattern, RuleMode::Regex)
    }

    /// Classify a pattern: anything containing `\`, `[` or `^` is a regex
    pub fn auto(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let mode = if pattern.contains(['\\', '[', '^']) {
            RuleMode::Regex
        } else {
            RuleMode::Literal
        };
        Self::with_mode(pattern, mode)
    }

    fn with_mode(pattern: impl Into<String>, mode: RuleMode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
            compiled: OnceLock::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    /// Whether `name` is covered by this rule
    pub fn matches(&self, name: &str) -> bool {
        match self.mode {
            RuleMode::Literal => eq_ignore_case(&self.pattern, name),
            RuleMode::Regex => self
                .compiled_regex()
                .is_some_and(|regex| regex.is_match(name)),
        }
    }

    fn compiled_regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| {
                match RegexBuilder::new(&self.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        tracing::warn!(
                            pattern = %self.pattern,
                            error = %e,
                            "invalid redaction pattern, rule disabled"
                        );
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl Clone for RedactionRule {
    fn clone(&self) -> Self {
        // Clones share nothing; each instance compiles its own regex
        Self::with_mode(self.pattern.clone(), self.mode)
    }
}

impl fmt::Debug for RedactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionRule")
            .field("pattern", &self.pattern)
            .field("mode", &self.mode)
            .field("compiled", &self.compiled.get().map(Option::is_some))
            .finish()
    }
}

impl From<&str> for RedactionRule {
    fn from(pattern: &str) -> Self {
        Self::auto(pattern)
    }
}

impl From<String> for RedactionRule {
    fn from(pattern: String) -> Self {
        Self::auto(pattern)
    }
}

/// First-match evaluation of a rule set in registration order
pub fn matches_any(rules: &[RedactionRule], name: &str) -> bool {
    rules.iter().any(|rule| rule.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_case_insensitive() {
        let rule = RedactionRule::literal("password");
        assert!(rule.matches("Password"));
        assert!(rule.matches("PASSWORD"));
        assert!(!rule.matches("password2"));
        assert!(!rule.matches("UserPassword"));
    }

    #[test]
    fn test_regex_matches_anywhere_case_insensitive() {
        let rule = RedactionRule::regex(r"token|secret");
        assert!(rule.matches("AccessToken"));
        assert!(rule.matches("CLIENT_SECRET"));
        assert!(!rule.matches("Username"));
    }

    #[test]
    fn test_regex_compiled_once_and_cached() {
        let rule = RedactionRule::regex(r"^card\d*$");
        assert!(rule.compiled.get().is_none());

        assert!(rule.matches("Card1"));
        let first = rule.compiled.get().and_then(Option::as_ref).map(|r| r as *const Regex);

        assert!(!rule.matches("DebitCard"));
        let second = rule.compiled.get().and_then(Option::as_ref).map(|r| r as *const Regex);

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_auto_classification() {
        assert_eq!(RedactionRule::auto("password").mode(), RuleMode::Literal);
        assert_eq!(RedactionRule::auto("api.key").mode(), RuleMode::Literal);
        assert_eq!(RedactionRule::auto(r"\w+Token").mode(), RuleMode::Regex);
        assert_eq!(RedactionRule::auto("[Ss]sn").mode(), RuleMode::Regex);
        assert_eq!(RedactionRule::auto("^secret").mode(), RuleMode::Regex);
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let rule = RedactionRule::regex("[unclosed");
        assert!(!rule.matches("unclosed"));
        assert!(!rule.matches("[unclosed"));
    }

    #[test]
    fn test_matches_any() {
        let rules = vec![RedactionRule::literal("ssn"), RedactionRule::regex("^api")];
        assert!(matches_any(&rules, "SSN"));
        assert!(matches_any(&rules, "ApiKey"));
        assert!(!matches_any(&rules, "Username"));
        assert!(!matches_any(&[], "anything"));
    }
}
