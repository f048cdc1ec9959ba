//! Message template formatting
//!
//! Templates use named placeholders (`"User {Username} logged in"`) that are
//! bound to arguments strictly by position: the first placeholder takes the
//! first argument, and so on, whatever the placeholder is called. The name
//! only becomes the property key.
//!
//! - `{{` emits a literal `{` and consumes no argument
//! - placeholders left over once the arguments run out are emitted as `{name}`
//! - an unterminated `{` emits the rest of the template verbatim
//! - arguments whose name matches a redaction rule are replaced by
//!   [`REDACTED_MARKER`] in both the message and the property map
//! - the final message never exceeds `max_length` characters

use super::properties::{FieldValue, Properties};
use super::redaction::{matches_any, RedactionRule, REDACTED_MARKER};
use std::fmt::Write;

const ELLIPSIS: &str = "...";

/// Result of formatting a template against its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    pub message: String,
    pub properties: Properties,
}

/// Format `template` with positional `args`
///
/// Pure: identical inputs always produce identical output.
pub fn format_template(
    template: &str,
    args: &[FieldValue],
    rules: &[RedactionRule],
    max_length: usize,
) -> FormattedMessage {
    let mut message = String::with_capacity(template.len() + args.len() * 8);
    let mut properties = Properties::with_capacity(args.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        if let Some(escaped) = after_open.strip_prefix('{') {
            message.push('{');
            rest = escaped;
            continue;
        }

        let Some(close) = after_open.find('}') else {
            // Unterminated placeholder
            message.push_str(&rest[open..]);
            rest = "";
            break;
        };

        let name = &after_open[..close];
        rest = &after_open[close + 1..];

        match args.next() {
            Some(_) if matches_any(rules, name) => {
                message.push_str(REDACTED_MARKER);
                properties.insert(name, REDACTED_MARKER);
            }
            Some(value) => {
                // Writing into a String cannot fail
                let _ = write!(message, "{}", value);
                properties.insert(name, value.clone());
            }
            None => {
                message.push('{');
                message.push_str(name);
                message.push('}');
            }
        }
    }
    message.push_str(rest);

    FormattedMessage {
        message: truncate_message(message, max_length),
        properties,
    }
}

/// Hard-truncate to exactly `max_length` characters ending in `...`
///
/// Messages at or under the limit are returned unchanged. Length is counted in
/// Unicode scalar values and the cut may fall inside a grapheme cluster.
pub fn truncate_message(message: String, max_length: usize) -> String {
    if message.chars().nth(max_length).is_none() {
        return message;
    }

    if max_length <= ELLIPSIS.len() {
        return ELLIPSIS[..max_length].to_string();
    }

    let keep = message
        .char_indices()
        .nth(max_length - ELLIPSIS.len())
        .map(|(idx, _)| idx)
        .unwrap_or(message.len());

    let mut truncated = String::with_capacity(keep + ELLIPSIS.len());
    truncated.push_str(&message[..keep]);
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<FieldValue> {
        values.iter().map(|v| FieldValue::from(*v)).collect()
    }

    #[test]
    fn test_basic_substitution() {
        let result = format_template(
            "User {Username} logged in from {IpAddress}",
            &args(&["john.doe", "192.168.1.1"]),
            &[],
            4000,
        );

        assert_eq!(result.message, "User john.doe logged in from 192.168.1.1");
        assert_eq!(
            result.properties.get("Username"),
            Some(&FieldValue::from("john.doe"))
        );
        assert_eq!(
            result.properties.get("IpAddress"),
            Some(&FieldValue::from("192.168.1.1"))
        );
    }

    #[test]
    fn test_literal_redaction() {
        let rules = vec![RedactionRule::literal("password")];
        let result = format_template(
            "Login attempt: {Username} with {Password}",
            &args(&["john.doe", "secret123"]),
            &rules,
            4000,
        );

        assert_eq!(result.message, "Login attempt: john.doe with ***REDACTED***");
        assert_eq!(
            result.properties.get("Password"),
            Some(&FieldValue::from(REDACTED_MARKER))
        );
        assert!(!result.message.contains("secret123"));
    }

    #[test]
    fn test_substitution_is_positional() {
        let result = format_template("{B} then {A}", &args(&["first", "second"]), &[], 100);
        assert_eq!(result.message, "first then second");
        assert_eq!(result.properties.get("B"), Some(&FieldValue::from("first")));
        assert_eq!(result.properties.get("A"), Some(&FieldValue::from("second")));
    }

    #[test]
    fn test_escaped_brace_consumes_no_argument() {
        let result = format_template("{{literal} {Value}", &args(&["x"]), &[], 100);
        assert_eq!(result.message, "{literal} x");
        assert_eq!(result.properties.len(), 1);
    }

    #[test]
    fn test_missing_arguments_leave_placeholder() {
        let result = format_template("{A} and {B}", &args(&["one"]), &[], 100);
        assert_eq!(result.message, "one and {B}");
        assert!(!result.properties.contains_key("B"));
    }

    #[test]
    fn test_extra_arguments_ignored() {
        let result = format_template("Only {One}", &args(&["1", "2", "3"]), &[], 100);
        assert_eq!(result.message, "Only 1");
        assert_eq!(result.properties.len(), 1);
    }

    #[test]
    fn test_unterminated_placeholder_is_verbatim() {
        let result = format_template("Value {A} and {broken", &args(&["1", "2"]), &[], 100);
        assert_eq!(result.message, "Value 1 and {broken");
    }

    #[test]
    fn test_null_and_numbers() {
        let result = format_template(
            "{Missing} {Count} {Ratio} {Flag}",
            &[FieldValue::Null, 3.into(), 0.25.into(), false.into()],
            &[],
            100,
        );
        assert_eq!(result.message, "null 3 0.25 false");
        assert_eq!(result.properties.get("Missing"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_repeated_name_last_write_wins() {
        let result = format_template("{Id} {id}", &args(&["a", "b"]), &[], 100);
        assert_eq!(result.message, "a b");
        assert_eq!(result.properties.len(), 1);
        assert_eq!(result.properties.get("ID"), Some(&FieldValue::from("b")));
    }

    #[test]
    fn test_truncation_exact_length() {
        let result = format_template("{Text}", &args(&["abcdefghijklmnop"]), &[], 10);
        assert_eq!(result.message, "abcdefg...");
        assert_eq!(result.message.chars().count(), 10);
    }

    #[test]
    fn test_truncation_not_applied_at_limit() {
        let result = format_template("exactly10!", &[], &[], 10);
        assert_eq!(result.message, "exactly10!");
    }

    #[test]
    fn test_truncation_multibyte() {
        let message = truncate_message("héllo wörld ünïcode".to_string(), 8);
        assert_eq!(message, "héllo...");
        assert_eq!(message.chars().count(), 8);
    }

    #[test]
    fn test_truncation_tiny_budget() {
        assert_eq!(truncate_message("abcdef".to_string(), 2), "..");
        assert_eq!(truncate_message("abcdef".to_string(), 3), "...");
        assert_eq!(truncate_message("abcdef".to_string(), 0), "");
    }
}
