//! Domain plugins.
//!
//! A plugin is the per-domain policy the mapping engine consults at every
//! decision point: which nodes to skip, how to type a column, whether an
//! element becomes a table, and which columns a table must always carry. The
//! default method bodies implement the generic behaviour, driven purely by the
//! plugin's `DomainConfig`.

mod generic;
mod nfe;
mod registry;

pub use generic::GenericPlugin;
pub use nfe::NfePlugin;
pub use registry::PluginRegistry;

use crate::classifier;
use crate::config::{DomainConfig, EssentialField, PatternRule};
use crate::model::SchemaModel;
use crate::tree::Node;
use std::fmt;
use tracing::warn;

/// Traversal state exposed to plugin hooks.
pub struct PluginContext<'a> {
    pub model: &'a mut SchemaModel,
    /// Element names from the traversal root down to the current node.
    pub path: &'a [String],
    pub parent_table: Option<&'a str>,
}

pub trait DomainPlugin: fmt::Debug {
    fn domain_name(&self) -> &str;

    fn config(&self) -> &DomainConfig;

    /// Compiled `pattern_mappings` of the config.
    fn pattern_rules(&self) -> &[PatternRule];

    /// Filter a node before mapping. `None` skips the node and its subtree.
    fn pre_process<'t>(&self, node: Node<'t>, _ctx: &PluginContext<'_>) -> Option<Node<'t>> {
        Some(node)
    }

    /// Called once a node has been mapped into `table` (the new table, or the
    /// table that received the column). Injects essential fields.
    fn post_process(&self, _node: Node<'_>, table: &str, ctx: &mut PluginContext<'_>) {
        let fields = self.essential_fields(table);
        if fields.is_empty() {
            return;
        }
        match ctx.model.table_mut(table) {
            Some(target) => target.apply_essential_fields(fields),
            None => warn!(
                domain = self.domain_name(),
                table, "table not found for essential fields"
            ),
        }
    }

    fn custom_type_mapping(&self, declared_type: &str) -> Option<String> {
        self.config().custom_types.get(declared_type).cloned()
    }

    fn field_override(&self, column: &str) -> Option<String> {
        self.config().field_overrides.get(column).cloned()
    }

    fn should_create_table(&self, node: Node<'_>, _parent_table: Option<&str>) -> bool {
        classifier::is_table(node, &self.config().xsd_namespace)
    }

    fn essential_fields(&self, table: &str) -> &[EssentialField] {
        self.config().essential_fields_for(table)
    }

    fn root_complex_type_prefixes(&self) -> &[String] {
        &self.config().root_complex_type_prefixes
    }
}
