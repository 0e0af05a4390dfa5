//! Rule compilation.
//!
//! Turns raw declarations into an ordered, immutable [`RuleSet`]:
//!
//! ```text
//! RawRuleDeclaration[]
//!     → drop empty declarations
//!     → split "VERB,VERB pattern" keys
//!     → normalize pattern and route (strip surrounding slashes)
//!     → infer mode (no GET in verb set → parsing only)
//!     → compile pattern
//!     → RuleSet (declaration order preserved)
//! ```
//!
//! Any fault aborts the whole compilation; a partially compiled rule set is
//! never returned.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::routing::pattern::{CompiledPattern, PatternFault};
use crate::routing::router::RuleSet;
use crate::routing::rule::{RawRuleDeclaration, Rule, RuleConfig, RuleMode, Verb};

/// Errors raised while compiling rule declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Pattern is empty once surrounding slashes are removed.
    #[error("rule #{index} ('{key}') has an empty pattern")]
    EmptyPattern { index: usize, key: String },

    /// The verb prefix of a rule key names an unknown verb.
    #[error("rule #{index} ('{key}') has an invalid verb '{verb}'")]
    InvalidVerb {
        index: usize,
        key: String,
        verb: String,
    },

    /// The pattern grammar is violated.
    #[error("rule #{index} ('{key}') has a malformed pattern: {fault}")]
    MalformedPattern {
        index: usize,
        key: String,
        fault: PatternFault,
    },
}

/// Compile declarations into a rule set.
pub fn compile(declarations: Vec<RawRuleDeclaration>) -> Result<RuleSet, CompileError> {
    let mut rules = Vec::with_capacity(declarations.len());

    for (index, declaration) in declarations.into_iter().enumerate() {
        if declaration.is_empty() {
            tracing::debug!(index, key = %declaration.key(), "Skipping empty rule declaration");
            continue;
        }
        rules.push(compile_one(index, declaration)?);
    }

    tracing::debug!(rules = rules.len(), "Rule set compiled");
    Ok(RuleSet::new(rules))
}

fn compile_one(index: usize, declaration: RawRuleDeclaration) -> Result<Rule, CompileError> {
    let (key, config) = match declaration {
        RawRuleDeclaration::Shorthand { pattern, route } => (pattern, RuleConfig::route(route)),
        RawRuleDeclaration::Keyed { key, config } => (key, config),
    };

    let (key_verbs, pattern) = split_verb_prefix(index, &key)?;
    let pattern = pattern.trim_matches('/').to_string();
    if pattern.is_empty() {
        return Err(CompileError::EmptyPattern { index, key });
    }

    let RuleConfig {
        route,
        verb,
        mode,
        params,
        extra,
    } = config;

    let verbs: BTreeSet<Verb> = verb.or(key_verbs).unwrap_or_default().into_iter().collect();
    let mode = mode.unwrap_or_else(|| infer_mode(&verbs));

    let compiled = CompiledPattern::compile(&pattern).map_err(|fault| {
        CompileError::MalformedPattern {
            index,
            key: key.clone(),
            fault,
        }
    })?;

    Ok(Rule {
        pattern,
        route: route.trim_matches('/').to_string(),
        verbs,
        mode,
        params,
        extra,
        compiled,
    })
}

/// A rule that can never serve a browser navigation must not build links.
fn infer_mode(verbs: &BTreeSet<Verb>) -> RuleMode {
    if !verbs.is_empty() && !verbs.contains(&Verb::Get) {
        RuleMode::ParsingOnly
    } else {
        RuleMode::Both
    }
}

/// Split `"POST,PUT some/pattern"` into its verbs and pattern.
///
/// A leading word made only of upper-case letters and commas is a verb list
/// and must name known verbs; anything else is taken as a plain pattern.
fn split_verb_prefix(index: usize, key: &str) -> Result<(Option<Vec<Verb>>, &str), CompileError> {
    let key_trimmed = key.trim();
    let Some((head, tail)) = key_trimmed.split_once(char::is_whitespace) else {
        return Ok((None, key_trimmed));
    };

    let looks_like_verbs = head
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == ',');
    if !looks_like_verbs {
        return Ok((None, key_trimmed));
    }

    let mut verbs = Vec::new();
    for token in head.split(',') {
        let verb = token.parse::<Verb>().map_err(|_| CompileError::InvalidVerb {
            index,
            key: key.to_string(),
            verb: token.to_string(),
        })?;
        verbs.push(verb);
    }

    Ok((Some(verbs), tail.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_verb_prefix_without_get_is_parsing_only() {
        let set = compile(vec![RawRuleDeclaration::keyed(
            "POST,PUT foo/<id>",
            RuleConfig::route("foo/save"),
        )])
        .unwrap();
        let rule = &set.rules()[0];

        assert_eq!(rule.pattern, "foo/<id>");
        assert_eq!(rule.verbs, BTreeSet::from([Verb::Post, Verb::Put]));
        assert_eq!(rule.mode, RuleMode::ParsingOnly);
    }

    #[test]
    fn test_get_prefix_keeps_both_modes() {
        let set = compile(vec![RawRuleDeclaration::keyed(
            "GET foo/<id>",
            RuleConfig::route("foo/show"),
        )])
        .unwrap();

        assert_eq!(set.rules()[0].mode, RuleMode::Both);
        assert_eq!(set.rules()[0].verbs, BTreeSet::from([Verb::Get]));
    }

    #[test]
    fn test_explicit_verb_and_mode_win() {
        let set = compile(vec![RawRuleDeclaration::keyed(
            "POST foo",
            RuleConfig::route("foo")
                .with_verbs([Verb::Get, Verb::Post])
                .with_mode(RuleMode::ParsingOnly),
        )])
        .unwrap();
        let rule = &set.rules()[0];

        assert_eq!(rule.pattern, "foo");
        assert_eq!(rule.verbs, BTreeSet::from([Verb::Get, Verb::Post]));
        assert_eq!(rule.mode, RuleMode::ParsingOnly);
    }

    #[test]
    fn test_explicit_mode_beats_inference() {
        let set = compile(vec![RawRuleDeclaration::keyed(
            "DELETE foo/<id>",
            RuleConfig::route("foo/delete").with_mode(RuleMode::Both),
        )])
        .unwrap();
        assert_eq!(set.rules()[0].mode, RuleMode::Both);
    }

    #[test]
    fn test_shorthand_matches_all_verbs() {
        let set = compile(vec![RawRuleDeclaration::shorthand("/news/", "/news/index/")]).unwrap();
        let rule = &set.rules()[0];

        assert_eq!(rule.pattern, "news");
        assert_eq!(rule.route, "news/index");
        assert!(rule.verbs.is_empty());
        assert_eq!(rule.mode, RuleMode::Both);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let err = compile(vec![
            RawRuleDeclaration::shorthand("ok", "a"),
            RawRuleDeclaration::keyed("GET /", RuleConfig::route("b")),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            CompileError::EmptyPattern {
                index: 1,
                key: "GET /".into()
            }
        );
    }

    #[test]
    fn test_unknown_verb_rejected() {
        let err = compile(vec![RawRuleDeclaration::keyed("POST,FETCH foo", RuleConfig::route("x"))])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidVerb { verb, .. } if verb == "FETCH"));

        let err = compile(vec![RawRuleDeclaration::keyed("POST, foo", RuleConfig::route("x"))])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidVerb { verb, .. } if verb.is_empty()));
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let err = compile(vec![RawRuleDeclaration::shorthand("blog/<slug", "blog")]).unwrap_err();
        assert!(matches!(err, CompileError::MalformedPattern { index: 0, .. }));
    }

    #[test]
    fn test_empty_declarations_dropped_and_order_kept() {
        let set = compile(vec![
            RawRuleDeclaration::shorthand("a", "first"),
            RawRuleDeclaration::shorthand("b", ""),
            RawRuleDeclaration::shorthand("c", "third"),
        ])
        .unwrap();

        let routes: Vec<_> = set.iter().map(|r| r.route.as_str()).collect();
        assert_eq!(routes, vec!["first", "third"]);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let decls = vec![
            RawRuleDeclaration::keyed(
                "POST,PUT api/<id:\\d+>",
                RuleConfig::route("api/save").with_params(params! { "x" => 1i64 }),
            ),
            RawRuleDeclaration::shorthand("blog/<slug>", "blog/show"),
            RawRuleDeclaration::keyed("GET feed", RuleConfig::route("feed")),
        ];

        let a = compile(decls.clone()).unwrap();
        let b = compile(decls).unwrap();
        assert_eq!(a.rules(), b.rules());
    }

    #[test]
    fn test_lowercase_prefix_is_plain_pattern() {
        let set = compile(vec![RawRuleDeclaration::shorthand("post list", "posts")]).unwrap();
        assert_eq!(set.rules()[0].pattern, "post list");
        assert!(set.rules()[0].verbs.is_empty());
    }
}
