//! Value parsing from combined region text.

use regex::Regex;
use tracing::debug;

use crate::error::RuleError;
use crate::models::layout::ParserConfig;

/// Parse a value out of `text`.
///
/// Patterns run in ascending priority. The first one whose capture group 1
/// (or whole match, for patterns without groups) is non-empty after trimming
/// wins. Patterns that fail to compile are reported in `errors` and skipped.
pub fn parse_value(text: &str, config: &ParserConfig, errors: &mut Vec<RuleError>) -> Option<String> {
    let mut patterns: Vec<_> = config.patterns.iter().collect();
    patterns.sort_by_key(|p| p.priority);

    for pattern in patterns {
        let regex = match Regex::new(&pattern.regex) {
            Ok(regex) => regex,
            Err(source) => {
                errors.push(RuleError::InvalidPattern {
                    pattern: pattern.regex.clone(),
                    source,
                });
                continue;
            }
        };

        let Some(caps) = regex.captures(text) else {
            continue;
        };

        let group = if regex.captures_len() > 1 { caps.get(1) } else { caps.get(0) };
        if let Some(value) = group.map(|m| m.as_str().trim()).filter(|v| !v.is_empty()) {
            debug!("Pattern {:?} matched {:?}", pattern.regex, value);
            return Some(value.to_string());
        }
    }

    if config.fallback_to_full_text && !text.is_empty() {
        return Some(text.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_priority_order_wins() {
        // Listed out of order on purpose.
        let config = ParserConfig::default()
            .with_pattern(".*", 2)
            .with_pattern("([0-9.]+) USD", 1);

        let mut errors = Vec::new();
        assert_eq!(
            parse_value("Total: 42.50 USD", &config, &mut errors),
            Some("42.50".to_string())
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_pattern_without_group_uses_full_match() {
        let config = ParserConfig::default()
            .with_fallback(false)
            .with_pattern(r"INV-\d+", 1);
        let mut errors = Vec::new();
        assert_eq!(
            parse_value("No. INV-881 dated", &config, &mut errors),
            Some("INV-881".to_string())
        );
    }

    #[test]
    fn test_empty_group_falls_through() {
        let config = ParserConfig::default()
            .with_fallback(false)
            .with_pattern(r"Total:(\s*)", 1)
            .with_pattern(r"(\d+)", 2);
        let mut errors = Vec::new();
        assert_eq!(
            parse_value("Total: 17", &config, &mut errors),
            Some("17".to_string())
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported_and_skipped() {
        let config = ParserConfig::default()
            .with_fallback(false)
            .with_pattern("([0-9", 1)
            .with_pattern("([0-9]+)", 2);

        let mut errors = Vec::new();
        assert_eq!(parse_value("qty 12", &config, &mut errors), Some("12".to_string()));
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], RuleError::InvalidPattern { pattern, .. } if pattern == "([0-9"));
    }

    #[test]
    fn test_fallback_behaviour() {
        let mut errors = Vec::new();
        let strict = ParserConfig::default().with_fallback(false).with_pattern("x(\\d)", 1);
        assert_eq!(parse_value("no digits", &strict, &mut errors), None);

        let lenient = strict.clone().with_fallback(true);
        assert_eq!(
            parse_value("no digits", &lenient, &mut errors),
            Some("no digits".to_string())
        );
    }
}
