//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a frozen [`Resolver`]
//! - Wire the bundled stores in as collaborators
//!
//! # Design Decisions
//! - Fail fast: a rule set that does not compile yields no resolver
//! - Used both at boot and on every hot reload, so both paths build alike

use std::sync::Arc;

use crate::config::schema::ResolverConfig;
use crate::resolution::collaborators::RuleContributor;
use crate::resolution::error::BuildError;
use crate::resolution::pipeline::{Resolver, ResolverBuilder};
use crate::store::{ConfigRuleSource, MemoryContentStore, MemoryTokenStore};

/// Build a replacement resolver that shares `tokens` with the one it replaces.
///
/// The token table is only brought in line with `config` once the build
/// succeeds, so a rejected reload leaves it untouched and usage counts
/// carry over to the new resolver.
pub async fn rebuild_resolver(
    config: &ResolverConfig,
    tokens: &MemoryTokenStore,
) -> Result<Resolver, BuildError> {
    let resolver = resolver_builder(config, Arc::new(tokens.clone())).build().await?;
    tokens.sync(&config.tokens);
    Ok(resolver)
}

/// Build a resolver from `config` using the in-memory stores.
pub async fn build_resolver(config: &ResolverConfig) -> Result<Resolver, BuildError> {
    build_resolver_with(config, Vec::new()).await
}

/// Like [`build_resolver`], registering `contributors` after the configured rules.
pub async fn build_resolver_with(
    config: &ResolverConfig,
    contributors: Vec<Arc<dyn RuleContributor>>,
) -> Result<Resolver, BuildError> {
    let tokens = Arc::new(MemoryTokenStore::from_config(&config.tokens));
    let mut builder = resolver_builder(config, tokens);

    for contributor in contributors {
        builder = builder.contributor(contributor);
    }

    builder.build().await
}

fn resolver_builder(config: &ResolverConfig, tokens: Arc<MemoryTokenStore>) -> ResolverBuilder {
    Resolver::builder()
        .settings(config.routing.resolver_settings())
        .content(Arc::new(MemoryContentStore::from_config(&config.content)))
        .tokens(tokens)
        .rule_source(Arc::new(ConfigRuleSource::from_config(config)))
}
