//! Rule declarations and compiled rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::routing::pattern::CompiledPattern;
use crate::routing::value::ParamMap;

/// HTTP verbs a rule may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Verb {
    pub const ALL: [Verb; 7] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
        }
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rule takes part in URL generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Used for both request parsing and URL generation.
    #[default]
    Both,
    /// Only used to parse requests; never used to build links.
    ParsingOnly,
}

/// Configuration object attached to a keyed rule declaration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Handler route the rule resolves to.
    pub route: String,

    /// Explicit verb restriction; wins over verbs embedded in the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<Vec<Verb>>,

    /// Explicit mode; when absent it is inferred from the verbs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RuleMode>,

    /// Literal params attached on match.
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub params: ParamMap,

    /// Any other fields, carried onto the compiled rule untouched.
    #[serde(flatten)]
    pub extra: ParamMap,
}

/// A rule as it arrives from configuration, before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRuleDeclaration {
    /// `key` is a pattern, optionally prefixed with `VERB,VERB `.
    ///
    /// `pattern` is accepted for `key`, so a table carrying `pattern` alongside
    /// `verb`, `mode` or `params` keeps them instead of reading as a shorthand.
    Keyed {
        #[serde(alias = "pattern")]
        key: String,
        #[serde(flatten)]
        config: RuleConfig,
    },
    /// Plain pattern → route, valid for every verb. Built in code; tables
    /// from config files always read as `Keyed`.
    Shorthand { pattern: String, route: String },
}

impl RawRuleDeclaration {
    pub fn shorthand(pattern: impl Into<String>, route: impl Into<String>) -> Self {
        RawRuleDeclaration::Shorthand {
            pattern: pattern.into(),
            route: route.into(),
        }
    }

    pub fn keyed(key: impl Into<String>, config: RuleConfig) -> Self {
        RawRuleDeclaration::Keyed {
            key: key.into(),
            config,
        }
    }

    /// The key or pattern string as written.
    pub fn key(&self) -> &str {
        match self {
            RawRuleDeclaration::Keyed { key, .. } => key,
            RawRuleDeclaration::Shorthand { pattern, .. } => pattern,
        }
    }

    /// Empty declarations are dropped before compilation.
    pub fn is_empty(&self) -> bool {
        match self {
            RawRuleDeclaration::Keyed { config, .. } => config.route.trim().is_empty(),
            RawRuleDeclaration::Shorthand { route, .. } => route.trim().is_empty(),
        }
    }
}

impl RuleConfig {
    pub fn route(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Default::default()
        }
    }

    pub fn with_verbs(mut self, verbs: impl IntoIterator<Item = Verb>) -> Self {
        self.verb = Some(verbs.into_iter().collect());
        self
    }

    pub fn with_mode(mut self, mode: RuleMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_params(mut self, params: ParamMap) -> Self {
        self.params = params;
        self
    }
}

/// A compiled, immutable routing rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Pattern without surrounding slashes; never empty.
    pub pattern: String,
    /// Handler identifier, without surrounding slashes.
    pub route: String,
    /// Allowed verbs; empty means every verb.
    pub verbs: BTreeSet<Verb>,
    pub mode: RuleMode,
    /// Literal params attached on match.
    pub params: ParamMap,
    pub extra: ParamMap,
    pub(crate) compiled: CompiledPattern,
}

impl Rule {
    pub fn allows(&self, verb: Verb) -> bool {
        self.verbs.is_empty() || self.verbs.contains(&verb)
    }

    /// Names of the placeholders in declaration order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.compiled.placeholder_names().collect()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
            && self.route == other.route
            && self.verbs == other.verbs
            && self.mode == other.mode
            && self.params == other.params
            && self.extra == other.extra
    }
}

/// The outcome of a successful resolution: a handler id plus its params.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteResult {
    pub handler: String,
    #[serde(default)]
    pub params: ParamMap,
}

impl RouteResult {
    pub fn new(handler: impl Into<String>, params: ParamMap) -> Self {
        Self {
            handler: handler.into(),
            params,
        }
    }

    pub fn handler_only(handler: impl Into<String>) -> Self {
        Self::new(handler, ParamMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_parsing_is_exact() {
        assert_eq!("POST".parse::<Verb>(), Ok(Verb::Post));
        assert!("post".parse::<Verb>().is_err());
        assert!("TRACE".parse::<Verb>().is_err());
    }

    #[test]
    fn test_declarations_from_toml() {
        #[derive(Deserialize)]
        struct File {
            rules: Vec<RawRuleDeclaration>,
        }

        let file: File = toml::from_str(
            r#"
            [[rules]]
            pattern = "news"
            route = "news/index"

            [[rules]]
            key = 'POST,PUT api/entries/<id:\d+>'
            route = "entries/save"
            section = "blog"

            [[rules]]
            key = "blog/<slug>"
            route = "blog/show"
            mode = "parsing_only"
            verb = ["GET", "HEAD"]
            params = { layout = "wide" }
            "#,
        )
        .unwrap();

        assert_eq!(file.rules.len(), 3);
        assert_eq!(
            file.rules[0],
            RawRuleDeclaration::keyed("news", RuleConfig::route("news/index"))
        );

        match &file.rules[1] {
            RawRuleDeclaration::Keyed { key, config } => {
                assert_eq!(key, r"POST,PUT api/entries/<id:\d+>");
                assert_eq!(config.route, "entries/save");
                assert_eq!(config.extra.get("section"), Some(&"blog".into()));
            }
            other => panic!("expected keyed declaration, got {:?}", other),
        }

        match &file.rules[2] {
            RawRuleDeclaration::Keyed { config, .. } => {
                assert_eq!(config.mode, Some(RuleMode::ParsingOnly));
                assert_eq!(config.verb, Some(vec![Verb::Get, Verb::Head]));
                assert_eq!(config.params.get("layout"), Some(&"wide".into()));
            }
            other => panic!("expected keyed declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_route_detection() {
        assert!(RawRuleDeclaration::shorthand("a", " ").is_empty());
        assert!(!RawRuleDeclaration::keyed("a", RuleConfig::route("x")).is_empty());
    }

    #[test]
    fn test_pattern_field_keeps_restrictions() {
        #[derive(Deserialize)]
        struct File {
            rules: Vec<RawRuleDeclaration>,
        }

        let file: File = toml::from_str(
            r#"
            [[rules]]
            pattern = "api/save"
            route = "api/save"
            verb = ["POST"]
            mode = "parsing_only"
            params = { x = "1" }
            "#,
        )
        .unwrap();

        match &file.rules[0] {
            RawRuleDeclaration::Keyed { key, config } => {
                assert_eq!(key, "api/save");
                assert_eq!(config.verb, Some(vec![Verb::Post]));
                assert_eq!(config.mode, Some(RuleMode::ParsingOnly));
                assert_eq!(config.params.get("x"), Some(&"1".into()));
                assert!(config.extra.is_empty());
            }
            other => panic!("expected keyed declaration, got {:?}", other),
        }
    }
}
