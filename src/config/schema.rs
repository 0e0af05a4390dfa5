//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the resolver.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resolution::pipeline::ResolverSettings;
use crate::resolution::request::SiteId;
use crate::routing::router::UrlOptions;
use crate::routing::rule::RawRuleDeclaration;
use crate::routing::value::ParamMap;

/// Root configuration for the resolver service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Resolution behavior.
    pub routing: RoutingConfig,

    /// Site rules, in declaration order.
    pub rules: Vec<RawRuleDeclaration>,

    /// Control panel rules, in declaration order.
    pub cp_rules: Vec<RawRuleDeclaration>,

    /// Addressable content records served by the bundled store.
    pub content: Vec<ContentConfig>,

    /// Capability tokens served by the bundled store.
    pub tokens: Vec<TokenConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for resolution and response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Resolution behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Whether the installation is complete (enables content lookup).
    pub installed: bool,

    /// Site used when the request does not name one.
    pub default_site_id: SiteId,

    /// Segment prefix marking a site path private.
    pub private_template_trigger: String,

    /// First path segment selecting the control panel.
    pub cp_trigger: String,

    /// Query parameter carrying a capability token.
    pub token_param: String,

    /// Path segment used for handler URLs no rule can express.
    pub action_trigger: String,

    /// Prefix for generated URLs.
    pub base_path: String,

    /// Handler of the public template fallback.
    pub fallback_handler: String,

    /// Param carrying the path on the fallback route.
    pub fallback_param: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            installed: true,
            default_site_id: SiteId::default(),
            private_template_trigger: "_".to_string(),
            cp_trigger: "admin".to_string(),
            token_param: "token".to_string(),
            action_trigger: "actions".to_string(),
            base_path: "/".to_string(),
            fallback_handler: "templates/render".to_string(),
            fallback_param: "template".to_string(),
        }
    }
}

impl RoutingConfig {
    /// Pipeline settings derived from this section.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            installed: self.installed,
            private_template_trigger: self.private_template_trigger.clone(),
            fallback_handler: self.fallback_handler.clone(),
            fallback_param: self.fallback_param.clone(),
            urls: UrlOptions {
                base_path: self.base_path.clone(),
                action_trigger: self.action_trigger.clone(),
            },
        }
    }
}

/// A content record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    /// Record identifier.
    pub id: String,

    /// Canonical URI (slashes around it are ignored).
    pub uri: String,

    #[serde(default)]
    pub site_id: SiteId,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Handler serving the record; the record is not routable without one.
    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default)]
    pub params: ParamMap,
}

/// A capability token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Token value as it appears in the request.
    pub token: String,

    /// Handler the token grants access to.
    pub handler: String,

    #[serde(default)]
    pub params: ParamMap,

    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<u64>,

    /// Maximum number of uses.
    #[serde(default)]
    pub usage_limit: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key that validation refuses when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
