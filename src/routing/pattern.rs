//! Rule pattern grammar.
//!
//! Patterns are slash-free at both ends and mix literal text with placeholders:
//!
//! - `<name>` captures one path segment (`[^/]+`)
//! - `<name:regex>` captures text matching `regex`
//!
//! A pattern is compiled once into an anchored regular expression plus one
//! anchored constraint per placeholder, used when generating URLs.

use regex::Regex;

use crate::routing::value::{ParamMap, ParamValue};

const DEFAULT_CONSTRAINT: &str = "[^/]+";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Placeholder { name: String, constraint: String },
}

/// A placeholder plus the anchored regex its values must satisfy.
#[derive(Debug, Clone)]
struct Placeholder {
    name: String,
    check: Regex,
}

/// Pattern compiled for matching and reverse generation.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    tokens: Vec<Token>,
    matcher: Regex,
    placeholders: Vec<Placeholder>,
}

/// Why a pattern failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternFault {
    Unclosed { at: usize },
    EmptyName { at: usize },
    InvalidName(String),
    DuplicateName(String),
    BadConstraint { name: String, reason: String },
}

impl std::fmt::Display for PatternFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternFault::Unclosed { at } => write!(f, "placeholder opened at byte {} is never closed", at),
            PatternFault::EmptyName { at } => write!(f, "placeholder at byte {} has no name", at),
            PatternFault::InvalidName(name) => write!(f, "invalid placeholder name '{}'", name),
            PatternFault::DuplicateName(name) => write!(f, "placeholder '{}' appears more than once", name),
            PatternFault::BadConstraint { name, reason } => {
                write!(f, "constraint for '{}' does not compile: {}", name, reason)
            }
        }
    }
}

impl CompiledPattern {
    /// Compile a normalized pattern.
    pub fn compile(pattern: &str) -> Result<Self, PatternFault> {
        let tokens = tokenize(pattern)?;

        let mut source = String::from("^");
        let mut placeholders: Vec<Placeholder> = Vec::new();

        for token in &tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Placeholder { name, constraint } => {
                    if placeholders.iter().any(|p| &p.name == name) {
                        return Err(PatternFault::DuplicateName(name.clone()));
                    }
                    let check = Regex::new(&format!("^(?:{})$", constraint)).map_err(|e| {
                        PatternFault::BadConstraint {
                            name: name.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    source.push_str(&format!("(?P<{}>{})", name, constraint));
                    placeholders.push(Placeholder {
                        name: name.clone(),
                        check,
                    });
                }
            }
        }
        source.push('$');

        let matcher = Regex::new(&source).map_err(|e| PatternFault::BadConstraint {
            name: placeholders
                .last()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            tokens,
            matcher,
            placeholders,
        })
    }

    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(|p| p.name.as_str())
    }

    /// Match a normalized path, returning the captured placeholder values.
    pub fn captures(&self, path: &str) -> Option<ParamMap> {
        let caps = self.matcher.captures(path)?;
        let mut params = ParamMap::new();
        for placeholder in &self.placeholders {
            if let Some(m) = caps.name(&placeholder.name) {
                params.insert(
                    placeholder.name.clone(),
                    ParamValue::String(m.as_str().to_string()),
                );
            }
        }
        Some(params)
    }

    /// Substitute placeholder values, encoding each with `encode`.
    ///
    /// Returns `None` when a placeholder is missing, not a scalar, or fails
    /// its constraint.
    pub fn render<F>(&self, params: &ParamMap, encode: F) -> Option<String>
    where
        F: Fn(&str) -> String,
    {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder { name, .. } => {
                    let value = params.get(name)?.as_scalar_text()?;
                    let placeholder = self.placeholders.iter().find(|p| &p.name == name)?;
                    if !placeholder.check.is_match(&value) {
                        return None;
                    }
                    out.push_str(&encode(&value));
                }
            }
        }
        Some(out)
    }
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternFault> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;
    let mut offset = 0;

    while let Some(open) = rest.find('<') {
        literal.push_str(&rest[..open]);
        let at = offset + open;
        let after = &rest[open + 1..];
        let close = after.find('>').ok_or(PatternFault::Unclosed { at })?;
        let body = &after[..close];

        let (name, constraint) = match body.split_once(':') {
            Some((name, constraint)) if !constraint.is_empty() => (name, constraint),
            Some((name, _)) => (name, DEFAULT_CONSTRAINT),
            None => (body, DEFAULT_CONSTRAINT),
        };

        if name.is_empty() {
            return Err(PatternFault::EmptyName { at });
        }
        if !is_valid_name(name) {
            return Err(PatternFault::InvalidName(name.to_string()));
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(Token::Placeholder {
            name: name.to_string(),
            constraint: constraint.to_string(),
        });

        let consumed = open + 1 + close + 1;
        rest = &rest[consumed..];
        offset += consumed;
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_literal_pattern() {
        let p = CompiledPattern::compile("about/team").unwrap();
        assert_eq!(p.captures("about/team"), Some(ParamMap::new()));
        assert_eq!(p.captures("about/team/x"), None);
        assert_eq!(p.captures("About/team"), None);
    }

    #[test]
    fn test_default_placeholder_is_one_segment() {
        let p = CompiledPattern::compile("blog/<slug>").unwrap();
        assert_eq!(p.captures("blog/hello"), Some(params! { "slug" => "hello" }));
        assert_eq!(p.captures("blog/hello/world"), None);
        assert_eq!(p.captures("blog/"), None);
    }

    #[test]
    fn test_constrained_placeholders() {
        let p = CompiledPattern::compile(r"entries/<section>/<id:\d+>").unwrap();
        assert_eq!(
            p.captures("entries/news/42"),
            Some(params! { "section" => "news", "id" => "42" })
        );
        assert_eq!(p.captures("entries/news/abc"), None);
    }

    #[test]
    fn test_catch_all_constraint() {
        let p = CompiledPattern::compile("files/<path:.+>").unwrap();
        assert_eq!(p.captures("files/a/b/c.txt"), Some(params! { "path" => "a/b/c.txt" }));
    }

    #[test]
    fn test_regex_metacharacters_in_literals_are_escaped() {
        let p = CompiledPattern::compile("feed.xml").unwrap();
        assert!(p.captures("feed.xml").is_some());
        assert!(p.captures("feedXxml").is_none());
    }

    #[test]
    fn test_malformed_patterns() {
        assert_eq!(
            CompiledPattern::compile("blog/<slug").unwrap_err(),
            PatternFault::Unclosed { at: 5 }
        );
        assert_eq!(
            CompiledPattern::compile("blog/<>").unwrap_err(),
            PatternFault::EmptyName { at: 5 }
        );
        assert!(matches!(
            CompiledPattern::compile("a/<x>/<x>").unwrap_err(),
            PatternFault::DuplicateName(n) if n == "x"
        ));
        assert!(matches!(
            CompiledPattern::compile("a/<1x>").unwrap_err(),
            PatternFault::InvalidName(_)
        ));
        assert!(matches!(
            CompiledPattern::compile("a/<id:(\\d+>").unwrap_err(),
            PatternFault::BadConstraint { .. }
        ));
    }

    #[test]
    fn test_render_checks_constraints() {
        let p = CompiledPattern::compile(r"entries/<id:\d+>").unwrap();
        let encode = |s: &str| s.to_string();

        assert_eq!(p.render(&params! { "id" => 7i64 }, encode).as_deref(), Some("entries/7"));
        assert_eq!(p.render(&params! { "id" => "seven" }, encode), None);
        assert_eq!(p.render(&ParamMap::new(), encode), None);
        assert_eq!(p.render(&params! { "id" => params! { "x" => 1i64 } }, encode), None);
    }
}
