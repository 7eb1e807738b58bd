use super::DomainPlugin;
use crate::config::{DomainConfig, PatternRule};
use crate::Result;

/// Plugin for schemas no specialised plugin claims. Everything comes from the
/// config; no literal field-name rules apply.
#[derive(Debug, Clone)]
pub struct GenericPlugin {
    config: DomainConfig,
    rules: Vec<PatternRule>,
}

impl GenericPlugin {
    pub fn new(config: DomainConfig) -> Result<Self> {
        let rules = config.pattern_rules()?;
        Ok(Self { config, rules })
    }
}

impl DomainPlugin for GenericPlugin {
    fn domain_name(&self) -> &str {
        &self.config.domain
    }

    fn config(&self) -> &DomainConfig {
        &self.config
    }

    fn pattern_rules(&self) -> &[PatternRule] {
        &self.rules
    }
}
