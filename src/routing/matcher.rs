//! Rule matching logic.
//!
//! # Responsibilities
//! - Check the request verb against the rule's verb set
//! - Match the normalized path against the compiled pattern
//! - Combine literal rule params with captured values
//!
//! # Design Decisions
//! - Empty verb set = every verb (wildcard)
//! - Path matching is case-sensitive
//! - Captured values win over literal params on key collision
//! - Patterns are already compiled; matching never fails, it only misses

use crate::resolution::request::Request;
use crate::routing::rule::{RouteResult, Rule};
use crate::routing::value::{merge_params, ParamMap};

/// Try `rule` against `request`.
pub fn match_rule(rule: &Rule, request: &Request) -> Option<RouteResult> {
    let captured = match_captures(rule, request)?;

    let mut params = rule.params.clone();
    merge_params(&mut params, captured);

    Some(RouteResult {
        handler: rule.route.clone(),
        params,
    })
}

/// Placeholder values only, without the rule's literal params.
pub fn match_captures(rule: &Rule, request: &Request) -> Option<ParamMap> {
    if !rule.allows(request.verb()) {
        return None;
    }
    rule.compiled.captures(request.path())
}
