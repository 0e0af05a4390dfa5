use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::http::server::AppState;
use crate::resolution::collaborators::RuleScope;
use crate::routing::rule::{Rule, RuleMode, Verb};
use crate::routing::value::{ParamMap, ParamValue};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub installed: bool,
    pub site_rules: usize,
    pub cp_rules: usize,
}

/// A compiled rule as reported by the admin API.
#[derive(Debug, Serialize, Deserialize)]
pub struct RuleView {
    pub pattern: String,
    pub route: String,
    pub verbs: BTreeSet<Verb>,
    pub mode: RuleMode,
    pub placeholders: Vec<String>,
    pub params: ParamMap,
}

impl From<&Rule> for RuleView {
    fn from(rule: &Rule) -> Self {
        Self {
            pattern: rule.pattern.clone(),
            route: rule.route.clone(),
            verbs: rule.verbs.clone(),
            mode: rule.mode,
            placeholders: rule.placeholders().into_iter().map(str::to_string).collect(),
            params: rule.params.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedUrl {
    pub url: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        installed: inner.resolver.settings().installed,
        site_rules: inner.resolver.rules(RuleScope::Site).len(),
        cp_rules: inner.resolver.rules(RuleScope::ControlPanel).len(),
    })
}

/// `GET /admin/rules?scope=site|cp`, site by default.
pub async fn get_rules(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<RuleView>>, (StatusCode, String)> {
    let scope = parse_scope(query.get("scope"))?;
    let inner = state.inner.load();
    Ok(Json(inner.resolver.rules(scope).iter().map(RuleView::from).collect()))
}

/// `GET /admin/url?handler=<h>&scope=<s>&<param>=<value>...`
///
/// Every query pair except `handler` and `scope` becomes a string param.
pub async fn get_url(
    State(state): State<AppState>,
    Query(mut query): Query<BTreeMap<String, String>>,
) -> Result<Json<GeneratedUrl>, (StatusCode, String)> {
    let scope = parse_scope(query.get("scope"))?;
    query.remove("scope");
    let handler = query
        .remove("handler")
        .filter(|h| !h.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "missing 'handler'".to_string()))?;

    let params: ParamMap = query
        .into_iter()
        .map(|(k, v)| (k, ParamValue::String(v)))
        .collect();

    let inner = state.inner.load();
    let url = inner.resolver.build_url(scope, &handler, &params);
    Ok(Json(GeneratedUrl { url }))
}

fn parse_scope(raw: Option<&String>) -> Result<RuleScope, (StatusCode, String)> {
    match raw {
        None => Ok(RuleScope::Site),
        Some(s) => s.parse().map_err(|e: String| (StatusCode::BAD_REQUEST, e)),
    }
}
