//! Prompt patterns for detecting when Evolver is waiting for input.
//!
//! Evolver's prompts are written for humans, not machines. Whitespace around
//! them shifts between builds and the trailing space may arrive in a later
//! read than the rest of the prompt, so the built-in prompts are compiled
//! from templates into whitespace-tolerant regexes.

use std::ops::Range;

use memchr::memmem::Finder;
use regex::bytes::Regex;

/// Prompt asking which datafile to load, shown once at startup.
pub const DATAFILE_PROMPT: &str = "Enter new datafile name (none to continue, q to quit): ";

/// Steady-state command prompt.
pub const MAIN_PROMPT: &str = "Enter command: ";

/// Literal prompt used when the main prompt could not be confirmed.
pub const FALLBACK_PROMPT: &str = "> ";

/// Trait for prompt matching - regex by default, extensible for custom parsers.
pub trait PromptMatcher: Send + Sync {
    /// Returns the byte range of the first match, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

/// Regex-based prompt matcher.
impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>> {
        self.find(data).map(|m| m.range())
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Fuzzy(Regex),
    Literal(Finder<'static>),
}

/// An immutable prompt pattern, either fuzzy (compiled from a template) or
/// an exact literal.
#[derive(Debug, Clone)]
pub struct PromptPattern {
    source: String,
    matcher: Matcher,
}

impl PromptPattern {
    /// Compile a whitespace-tolerant pattern from a prompt template.
    ///
    /// See [`compile_template`] for the rules.
    pub fn fuzzy(template: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&compile_template(template))?;
        Ok(Self {
            source: template.to_string(),
            matcher: Matcher::Fuzzy(regex),
        })
    }

    /// Build an exact, byte-for-byte pattern.
    pub fn literal(text: &str) -> Self {
        Self {
            source: text.to_string(),
            matcher: Matcher::Literal(Finder::new(text.as_bytes()).into_owned()),
        }
    }

    /// The datafile-selection prompt.
    pub fn datafile() -> Result<Self, regex::Error> {
        Self::fuzzy(DATAFILE_PROMPT)
    }

    /// The main command prompt.
    pub fn main() -> Result<Self, regex::Error> {
        Self::fuzzy(MAIN_PROMPT)
    }

    /// The degraded-mode literal prompt.
    pub fn fallback() -> Self {
        Self::literal(FALLBACK_PROMPT)
    }

    /// The template or literal this pattern was built from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this is an exact literal pattern.
    pub fn is_literal(&self) -> bool {
        matches!(self.matcher, Matcher::Literal(_))
    }
}

impl PromptMatcher for PromptPattern {
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>> {
        match &self.matcher {
            Matcher::Fuzzy(regex) => regex.find_match(data),
            Matcher::Literal(finder) => finder
                .find(data)
                .map(|start| start..start + finder.needle().len()),
        }
    }
}

/// Turn a prompt template into a regex source string.
///
/// - literal text is escaped
/// - every internal whitespace run may be any amount of whitespace (or none)
/// - trailing spaces/tabs are optional, so `"Enter command:"` matches
///   before the final space has been read
pub fn compile_template(template: &str) -> String {
    let mut pattern = String::with_capacity(template.len() * 2);
    for (i, word) in template.split_whitespace().enumerate() {
        if i > 0 {
            pattern.push_str(r"\s*");
        }
        pattern.push_str(&regex::escape(word));
    }
    pattern.push_str(r"[ \t]*");
    pattern
}
