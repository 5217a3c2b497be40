//! Regex expression handling.
//!
//! Configuration regexes are written `/pattern/flags` and sort-key rules
//! `/pattern/replacement/flags`, where the separator is whatever character
//! the expression starts with. Supported flags: `i`, `m`, `s`, `u`, `x`.

use crate::error::{Result, SheetMergeError};
use regex::{Regex, RegexBuilder};

/// Quote characters accepted interchangeably by generated patterns.
const QUOTE_CLASS: &str = "['\u{2018}\u{2019}\"\u{201C}\u{201D}]";

fn pattern_error(expr: &str, reason: &str) -> SheetMergeError {
    SheetMergeError::Pattern {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}

fn build_regex(expr: &str, pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            _ => return Err(pattern_error(expr, &format!("unknown flag '{}'", flag))),
        };
    }
    builder
        .build()
        .map_err(|e| pattern_error(expr, &e.to_string()))
}

/// Positions of the separator character within an expression, excluding the
/// leading one.
fn separator_positions(expr: &str) -> Result<(char, Vec<usize>)> {
    let sep = expr
        .chars()
        .next()
        .ok_or_else(|| pattern_error(expr, "empty expression"))?;
    let positions = expr
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == sep)
        .map(|(i, _)| i)
        .collect();
    Ok((sep, positions))
}

/// Parses a `/pattern/flags` expression into a compiled regex.
pub fn parse_expr(expr: &str) -> Result<Regex> {
    let (sep, positions) = separator_positions(expr)?;
    let last = *positions
        .last()
        .ok_or_else(|| pattern_error(expr, &format!("missing closing '{}'", sep)))?;
    let pattern = &expr[sep.len_utf8()..last];
    if pattern.is_empty() {
        return Err(pattern_error(expr, "empty pattern"));
    }
    let flags = &expr[last + sep.len_utf8()..];
    build_regex(expr, pattern, flags)
}

/// True if `regex` matches starting at the beginning of `value`.
pub fn matches_start(regex: &Regex, value: &str) -> bool {
    regex.find(value).map_or(false, |m| m.start() == 0)
}

/// A `/pattern/replacement/flags` match-and-substitute rule.
///
/// The rule only applies when the pattern matches at the start of the input;
/// when it applies, every occurrence is substituted.
#[derive(Debug, Clone)]
pub struct SubstRule {
    regex: Regex,
    replacement: String,
}

impl SubstRule {
    pub fn parse(expr: &str) -> Result<Self> {
        let (sep, positions) = separator_positions(expr)?;
        if positions.len() < 2 {
            return Err(pattern_error(expr, "expected /pattern/replacement/flags"));
        }
        let last = positions[positions.len() - 1];
        let mid = positions[positions.len() - 2];
        let pattern = &expr[sep.len_utf8()..mid];
        let replacement = &expr[mid + sep.len_utf8()..last];
        if pattern.is_empty() || replacement.is_empty() {
            return Err(pattern_error(expr, "empty pattern or replacement"));
        }
        let flags = &expr[last + sep.len_utf8()..];
        Ok(Self {
            regex: build_regex(expr, pattern, flags)?,
            replacement: convert_replacement(replacement),
        })
    }

    /// Applies the rule, returning `None` when the pattern does not match
    /// at the start of the input.
    pub fn apply(&self, input: &str) -> Option<String> {
        if !matches_start(&self.regex, input) {
            return None;
        }
        Some(self.regex.replace_all(input, self.replacement.as_str()).into_owned())
    }
}

/// Rewrites `\1`-style backreferences to the `${1}` form and escapes
/// literal `$`.
fn convert_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                out.push_str("${");
                while let Some(d) = chars.peek().filter(|n| n.is_ascii_digit()) {
                    out.push(*d);
                    chars.next();
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Generates the default matcher expression for a configured name:
/// a case-insensitive substring match with whitespace runs in the name
/// accepting any amount of whitespace, special characters escaped, and
/// straight/smart quotes accepted interchangeably.
pub fn default_expr(name: &str) -> String {
    let name = name.trim().to_lowercase();
    let mut pattern = String::new();
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                pattern.push_str(r"\s+");
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if QUOTE_CLASS.contains(c) && c != '[' && c != ']' {
            pattern.push_str(QUOTE_CLASS);
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }
    format!("/.*{}.*/i", pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let r = parse_expr("/test/").unwrap();
        assert!(matches_start(&r, "test"));
        assert!(!matches_start(&r, "Test"));
    }

    #[test]
    fn test_parse_case_insensitive() {
        let r = parse_expr("/test/i").unwrap();
        assert!(matches_start(&r, "test"));
        assert!(matches_start(&r, "Test"));
    }

    #[test]
    fn test_parse_multiline() {
        let r = parse_expr(r"/test\s+me/im").unwrap();
        assert!(matches_start(&r, "test\nme"));
        assert!(matches_start(&r, "test\nME"));
    }

    #[test]
    fn test_parse_alternative_separator() {
        let r = parse_expr("|test|i").unwrap();
        assert!(matches_start(&r, "Test"));
    }

    #[test]
    fn test_parse_embedded_separator() {
        // Only the last separator ends the pattern.
        let r = parse_expr("/a/b/i").unwrap();
        assert!(matches_start(&r, "A/B"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("/unterminated").is_err());
        assert!(parse_expr("/test/z").is_err());
    }

    #[test]
    fn test_match_anchored_at_start() {
        let r = parse_expr("/[Do]+/i").unwrap();
        assert!(matches_start(&r, "dodo"));
        assert!(!matches_start(&r, "yehaa"));
        assert!(!matches_start(&r, "xx dodo"));
    }

    #[test]
    fn test_substitute_simple() {
        let rule = SubstRule::parse(r"/t(es)t/-\1-/").unwrap();
        assert_eq!(rule.apply("test").as_deref(), Some("-es-"));
        assert_eq!(rule.apply("toast"), None);
    }

    #[test]
    fn test_substitute_extract_number() {
        let rule = SubstRule::parse(r"/.*?(\d+).*/\1/i").unwrap();
        assert_eq!(rule.apply("examples/example-01.xlsx").as_deref(), Some("01"));
    }

    #[test]
    fn test_substitute_invalid() {
        assert!(SubstRule::parse("/onlypattern/").is_err());
        assert!(SubstRule::parse("/a//").is_err());
    }

    #[test]
    fn test_default_expr_flexible_whitespace() {
        let r = parse_expr(&default_expr("List 1")).unwrap();
        assert!(matches_start(&r, "   List    1   "));
        assert!(matches_start(&r, "list 1"));
        assert!(!matches_start(&r, "List 2"));
    }

    #[test]
    fn test_default_expr_no_inserted_whitespace() {
        // "List4" has no configured whitespace, so none may be inserted.
        let r = parse_expr(&default_expr("List4")).unwrap();
        assert!(matches_start(&r, "List4"));
        assert!(!matches_start(&r, "List 4"));
    }

    #[test]
    fn test_default_expr_escapes_special_characters() {
        let r = parse_expr(&default_expr("Cost (GBP)")).unwrap();
        assert!(matches_start(&r, "Cost (GBP)"));
        assert!(!matches_start(&r, "Cost xGBPx"));
    }

    #[test]
    fn test_default_expr_quote_variants() {
        let r = parse_expr(&default_expr("Child's ID")).unwrap();
        assert!(matches_start(&r, "Child's ID"));
        assert!(matches_start(&r, "Child\u{2019}s ID"));
    }
}
