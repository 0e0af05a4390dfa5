//! Compiled rule lookup and URL generation.
//!
//! # Responsibilities
//! - Store compiled rules in declaration order
//! - Look up the first rule matching a request
//! - Generate URLs for a handler + params (reverse direction)
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - O(n) scan in declaration order; first match wins
//! - Parsing-only rules are invisible to URL generation
//! - Explicit no-match (`None`) rather than a silent default

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::form_urlencoded;

use crate::resolution::request::Request;
use crate::routing::matcher::{match_captures, match_rule};
use crate::routing::rule::{RouteResult, Rule, RuleMode};
use crate::routing::value::{ParamMap, ParamValue};

/// Characters escaped in placeholder values. `/` survives for catch-all placeholders.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Where generated URLs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    /// Prefix for every generated URL.
    pub base_path: String,
    /// Path segment used when no rule can express a handler.
    pub action_trigger: String,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            action_trigger: "actions".to_string(),
        }
    }
}

impl UrlOptions {
    fn prefix(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }
}

/// An ordered, frozen list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub(crate) fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }

    /// First rule matching the request, with its route.
    pub fn match_request(&self, request: &Request) -> Option<(&Rule, RouteResult)> {
        self.rules
            .iter()
            .find_map(|rule| match_rule(rule, request).map(|route| (rule, route)))
    }

    /// First rule matching the request, with its captured values only.
    pub fn match_captures(&self, request: &Request) -> Option<(&Rule, ParamMap)> {
        self.rules
            .iter()
            .find_map(|rule| match_captures(rule, request).map(|captured| (rule, captured)))
    }

    /// Build a URL for `handler` with `params`.
    ///
    /// Uses the first non-parsing-only rule for the handler that can express
    /// every placeholder; leftover params become the query string. Without a
    /// usable rule, falls back to `<action_trigger>/<handler>`.
    pub fn build_url(&self, handler: &str, params: &ParamMap, options: &UrlOptions) -> String {
        let handler = handler.trim_matches('/');
        let prefix = options.prefix();

        for rule in &self.rules {
            if let Some((path, rest)) = try_rule(rule, handler, params) {
                return with_query(format!("{}{}", prefix, path), &rest);
            }
        }

        tracing::trace!(handler, "No rule can express handler, using action path");
        let path = format!(
            "{}{}/{}",
            prefix,
            options.action_trigger.trim_matches('/'),
            handler
        );
        with_query(path, params)
    }
}

fn try_rule(rule: &Rule, handler: &str, params: &ParamMap) -> Option<(String, ParamMap)> {
    if rule.mode == RuleMode::ParsingOnly || rule.route != handler {
        return None;
    }

    // A literal param the caller overrides with a different value rules this one out.
    let conflicts = rule
        .params
        .iter()
        .any(|(key, literal)| params.get(key).is_some_and(|given| given != literal));
    if conflicts {
        return None;
    }

    let path = rule
        .compiled
        .render(params, |v| utf8_percent_encode(v, PATH_VALUE).to_string())?;

    let placeholders: Vec<&str> = rule.compiled.placeholder_names().collect();
    let rest: ParamMap = params
        .iter()
        .filter(|(key, _)| !placeholders.contains(&key.as_str()) && !rule.params.contains_key(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some((path, rest))
}

fn with_query(path: String, params: &ParamMap) -> String {
    if params.is_empty() {
        return path;
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        append_pairs(&mut serializer, key.clone(), value);
    }
    format!("{}?{}", path, serializer.finish())
}

fn append_pairs(serializer: &mut form_urlencoded::Serializer<'_, String>, key: String, value: &ParamValue) {
    match value {
        ParamValue::Map(map) => {
            for (k, v) in map {
                append_pairs(serializer, format!("{}[{}]", key, k), v);
            }
        }
        ParamValue::List(items) => {
            for (i, v) in items.iter().enumerate() {
                append_pairs(serializer, format!("{}[{}]", key, i), v);
            }
        }
        scalar => {
            serializer.append_pair(&key, &scalar.as_scalar_text().unwrap_or_default());
        }
    }
}
