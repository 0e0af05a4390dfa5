//! Rule declarations read from the configuration file.

use async_trait::async_trait;

use crate::config::schema::ResolverConfig;
use crate::resolution::collaborators::{CollaboratorError, RuleScope, RuleSource};
use crate::routing::rule::RawRuleDeclaration;

/// Serves `[[rules]]` and `[[cp_rules]]` from a loaded config.
#[derive(Debug, Clone, Default)]
pub struct ConfigRuleSource {
    site: Vec<RawRuleDeclaration>,
    control_panel: Vec<RawRuleDeclaration>,
}

impl ConfigRuleSource {
    pub fn new(site: Vec<RawRuleDeclaration>, control_panel: Vec<RawRuleDeclaration>) -> Self {
        Self {
            site,
            control_panel,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.rules.clone(), config.cp_rules.clone())
    }
}

#[async_trait]
impl RuleSource for ConfigRuleSource {
    async fn configured_rules(
        &self,
        scope: RuleScope,
    ) -> Result<Vec<RawRuleDeclaration>, CollaboratorError> {
        Ok(match scope {
            RuleScope::Site => self.site.clone(),
            RuleScope::ControlPanel => self.control_panel.clone(),
        })
    }
}
