//! Matcher strategies.
//!
//! A `MatcherSpec` is an ordered list of independent matcher strategies;
//! a candidate string is accepted if any strategy accepts it. Regex is the
//! only strategy today, but alternatives (e.g. exact string) can be added
//! behind the same shape without changing callers.

use crate::error::Result;
use crate::pattern;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(expr: &str) -> Result<Self> {
        Ok(Self {
            regex: pattern::parse_expr(expr)?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(RegexMatcher),
}

impl Matcher {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Matcher::Regex(m) => pattern::matches_start(&m.regex, value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatcherSpec {
    matchers: Vec<Matcher>,
}

impl MatcherSpec {
    /// Compiles one regex matcher per expression, preserving order.
    pub fn from_exprs<I, S>(exprs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matchers = Vec::new();
        for expr in exprs {
            matchers.push(Matcher::Regex(RegexMatcher::new(expr.as_ref())?));
        }
        Ok(Self { matchers })
    }

    /// Ordered strategies, for callers that need per-strategy precedence.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// True if any strategy accepts the value.
    pub fn accepts(&self, value: &str) -> bool {
        self.matchers.iter().any(|m| m.accepts(value))
    }
}
