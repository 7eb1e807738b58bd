use super::{DomainPlugin, GenericPlugin, NfePlugin};
use crate::config::DomainConfig;
use crate::tree::SchemaTree;
use crate::{Error, Result};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

const GENERIC_DOMAIN: &str = "generic";
const NFE_DOMAIN: &str = "nfe";

/// Type names that identify NF-e layouts even when the schema carries neither
/// the portal namespace nor one of the usual root elements.
const NFE_FALLBACK_MARKERS: &[&str] = &["TNFe", "TEnviNFe", "TProtNFe", "infNFe"];

/// Ordered set of domain plugins, keyed by domain name.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Box<dyn DomainPlugin>>,
}

impl PluginRegistry {
    /// The `generic` and `nfe` presets.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self {
            plugins: IndexMap::new(),
        };
        registry.register(Box::new(GenericPlugin::new(DomainConfig::generic())?));
        registry.register(Box::new(NfePlugin::new(DomainConfig::nfe())?));
        Ok(registry)
    }

    /// Built-in presets overlaid with loaded descriptors. A descriptor for an
    /// existing domain replaces the preset.
    pub fn from_configs(configs: impl IntoIterator<Item = DomainConfig>) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for config in configs {
            let plugin: Box<dyn DomainPlugin> = if config.domain == NFE_DOMAIN {
                Box::new(NfePlugin::new(config)?)
            } else {
                Box::new(GenericPlugin::new(config)?)
            };
            registry.register(plugin);
        }
        Ok(registry)
    }

    /// Add or replace the plugin for its domain.
    pub fn register(&mut self, plugin: Box<dyn DomainPlugin>) {
        let domain = plugin.domain_name().to_string();
        if self.plugins.insert(domain.clone(), plugin).is_some() {
            debug!(domain = %domain, "replaced domain plugin");
        }
    }

    pub fn get(&self, domain: &str) -> Option<&dyn DomainPlugin> {
        self.plugins.get(domain).map(|plugin| plugin.as_ref())
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Pick the plugin for `tree`.
    ///
    /// An explicit, registered domain wins. Otherwise the first plugin whose
    /// namespace indicator occurs in the document text, or whose root-element
    /// indicator names any node, is chosen; then the NF-e markers; then
    /// `generic`.
    pub fn select(&self, tree: &SchemaTree, explicit: Option<&str>) -> Result<&dyn DomainPlugin> {
        if let Some(domain) = explicit {
            match self.get(domain) {
                Some(plugin) => {
                    info!(domain, "using requested domain");
                    return Ok(plugin);
                }
                None => warn!(domain, "unknown domain requested, detecting instead"),
            }
        }

        let names: Vec<&str> = std::iter::once(tree.root())
            .chain(tree.root().descendants())
            .filter_map(|node| node.name())
            .collect();

        for (domain, plugin) in &self.plugins {
            let config = plugin.config();
            let by_namespace = config
                .namespace_indicators
                .iter()
                .any(|ns| tree.source().contains(ns.as_str()));
            let by_root = config
                .root_element_indicators
                .iter()
                .any(|indicator| names.contains(&indicator.as_str()));
            if by_namespace || by_root {
                info!(domain = %domain, by_namespace, by_root, "detected domain");
                return Ok(plugin.as_ref());
            }
        }

        if NFE_FALLBACK_MARKERS
            .iter()
            .any(|marker| tree.source().contains(marker))
        {
            if let Some(plugin) = self.get(NFE_DOMAIN) {
                info!(domain = NFE_DOMAIN, "detected domain from NF-e type names");
                return Ok(plugin);
            }
        }

        info!(domain = GENERIC_DOMAIN, "no domain detected");
        self.get(GENERIC_DOMAIN)
            .ok_or_else(|| Error::Config("no generic plugin registered".to_string()))
    }
}
