//! XSD to relational mapping.
//!
//! The engine walks global element declarations depth-first. Each element is
//! either a table (linked to the enclosing table by a foreign key) or a column
//! of the enclosing table; the active domain plugin gets the first and last
//! word on every node.

use crate::classifier;
use crate::context::ContextIndex;
use crate::ddl::DdlAssembler;
use crate::model::{Column, SchemaModel};
use crate::plugin::{DomainPlugin, PluginContext, PluginRegistry};
use crate::resolver::{declared_type, TypeLibrary, TypeResolver};
use crate::tree::{Node, NodeId, SchemaTree};
use crate::Result;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Column holding the value of a table-mapped element without element
/// content: a typed `simpleContent` extension, or a repeatable scalar.
const VALUE_COLUMN: &str = "value";

/// Result of one conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub domain: String,
    pub model: SchemaModel,
    pub ddl: String,
}

/// Entry point for conversions. Holds only the plugin registry, so one engine
/// can serve any number of runs.
#[derive(Debug)]
pub struct MappingEngine {
    registry: PluginRegistry,
}

impl MappingEngine {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Map `main` and render its DDL.
    ///
    /// `aux_types` are additional schema documents consulted only for named
    /// simple types. `domain` forces a plugin; unknown names fall back to
    /// detection.
    pub fn convert(
        &self,
        main: &SchemaTree,
        aux_types: &[SchemaTree],
        domain: Option<&str>,
    ) -> Result<Conversion> {
        let plugin = self.registry.select(main, domain)?;
        let model = build_model(plugin, main, aux_types);
        let ddl = DdlAssembler::new(plugin.domain_name()).assemble(&model);

        Ok(Conversion {
            domain: plugin.domain_name().to_string(),
            model,
            ddl,
        })
    }

    /// Map `main` without rendering.
    pub fn map(
        &self,
        main: &SchemaTree,
        aux_types: &[SchemaTree],
        domain: Option<&str>,
    ) -> Result<SchemaModel> {
        let plugin = self.registry.select(main, domain)?;
        Ok(build_model(plugin, main, aux_types))
    }
}

fn build_model(plugin: &dyn DomainPlugin, main: &SchemaTree, aux_types: &[SchemaTree]) -> SchemaModel {
    let xsd_ns = plugin.config().xsd_namespace.as_str();
    let (tree, roots) = root_elements(plugin, main);
    let tree: &SchemaTree = &tree;

    let library = TypeLibrary::build(std::iter::once(tree).chain(aux_types), xsd_ns);
    info!(
        domain = plugin.domain_name(),
        roots = roots.len(),
        simple_types = library.len(),
        "mapping schema"
    );

    let mut run = Run {
        plugin,
        xsd_ns,
        context: ContextIndex::build(tree, xsd_ns),
        resolver: TypeResolver::new(plugin, &library),
        processed: HashSet::new(),
        model: SchemaModel::new(),
        path: Vec::new(),
    };
    for root in roots {
        run.process_element(tree.node(root), None);
    }

    info!(tables = run.model.len(), "mapping complete");
    run.model
}

/// Global element declarations, or when there are none, one synthesized
/// element per top-level complex type whose name carries a root prefix.
fn root_elements<'m>(
    plugin: &dyn DomainPlugin,
    main: &'m SchemaTree,
) -> (Cow<'m, SchemaTree>, Vec<NodeId>) {
    let xsd_ns = plugin.config().xsd_namespace.as_str();
    let globals: Vec<NodeId> = main.root().child_elements(xsd_ns).map(|n| n.id()).collect();
    if !globals.is_empty() {
        return (Cow::Borrowed(main), globals);
    }

    let prefixes = plugin.root_complex_type_prefixes();
    let candidates: Vec<(NodeId, &str)> = main
        .root()
        .children()
        .filter(|node| node.is(xsd_ns, "complexType"))
        .filter_map(|node| {
            node.name()
                .filter(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
                .map(|name| (node.id(), name))
        })
        .collect();

    if candidates.is_empty() {
        warn!("schema has no global elements and no root complex types");
        return (Cow::Borrowed(main), Vec::new());
    }

    let mut tree = main.clone();
    let roots = candidates
        .into_iter()
        .map(|(id, name)| {
            info!(complex_type = name, "synthesizing root element");
            tree.synthesize_element(xsd_ns, name, id)
        })
        .collect();
    (Cow::Owned(tree), roots)
}

/// State of a single mapping run.
struct Run<'a, 't> {
    plugin: &'a dyn DomainPlugin,
    xsd_ns: &'a str,
    context: ContextIndex<'t>,
    resolver: TypeResolver<'a, 't>,
    /// `(element name, path)` pairs already mapped.
    processed: HashSet<(String, String)>,
    model: SchemaModel,
    path: Vec<String>,
}

impl<'a, 't> Run<'a, 't> {
    fn process_element(&mut self, node: Node<'t>, parent_table: Option<&str>) {
        if node.name().is_none() {
            debug!(?node, "skipping element without name");
            return;
        }

        let ctx = PluginContext {
            model: &mut self.model,
            path: &self.path,
            parent_table,
        };
        let Some(node) = self.plugin.pre_process(node, &ctx) else {
            return;
        };
        let Some(name) = node.name() else {
            return;
        };

        let key = (name.to_string(), self.path.join("/"));
        if !self.processed.insert(key) {
            debug!(element = name, path = %self.path.join("/"), "already processed");
            return;
        }

        self.path.push(name.to_string());

        if self.plugin.should_create_table(node, parent_table) {
            let table = self.create_table(node, name, parent_table);
            self.post_process(node, &table, parent_table);
            self.walk_content(node, &table);
        } else if let Some(table) = self.map_column(node, name, parent_table) {
            self.post_process(node, &table, parent_table);
        }

        self.path.pop();
    }

    fn post_process(&mut self, node: Node<'t>, table: &str, parent_table: Option<&str>) {
        let mut ctx = PluginContext {
            model: &mut self.model,
            path: &self.path,
            parent_table,
        };
        self.plugin.post_process(node, table, &mut ctx);
    }

    fn create_table(&mut self, node: Node<'t>, name: &str, parent_table: Option<&str>) -> String {
        let table = self.model.create_table(name, parent_table);
        info!(table = %table, parent = ?parent_table, "created table");

        if self.has_simple_content_extension(node) || classifier::is_scalar(node, self.xsd_ns) {
            let resolved = self.resolver.resolve(node);
            debug!(table = %table, sql_type = %resolved.sql_type, "adding value column");
            self.model
                .add_column(&table, Column::new(VALUE_COLUMN, resolved.sql_type, true));
        }
        table
    }

    fn map_column(&mut self, node: Node<'t>, name: &str, parent_table: Option<&str>) -> Option<String> {
        let Some(table) = parent_table else {
            debug!(element = name, "top-level scalar element has no table");
            return None;
        };

        let resolved = self.resolver.resolve(node);
        let mut column = Column::new(name, resolved.sql_type, classifier::is_required(node));
        if self.context.is_choice_member(node) {
            debug!(
                element = name,
                table,
                siblings = ?self.context.choice_siblings(node),
                "choice member column"
            );
            column = column.into_choice();
        }
        self.model.add_column(table, column);
        Some(table.to_string())
    }

    /// Visit the element declarations of a table's definition in document
    /// order, descending through groups and type wrappers but never into
    /// nested element declarations (those recurse via `process_element`).
    fn walk_content(&mut self, container: Node<'t>, table: &str) {
        for child in container.children() {
            if child.is(self.xsd_ns, "element") {
                self.process_element(child, Some(table));
                continue;
            }

            if child.is(self.xsd_ns, "choice") {
                let names = child
                    .child_elements(self.xsd_ns)
                    .filter_map(|member| member.name())
                    .map(str::to_string)
                    .collect();
                self.model.record_choice_group(table, names);
            }
            self.walk_content(child, table);
        }
    }

    fn has_simple_content_extension(&self, node: Node<'t>) -> bool {
        node.find_first_scoped(self.xsd_ns, "simpleContent")
            .is_some_and(|sc| sc.children().any(|c| c.is(self.xsd_ns, "extension")))
            && declared_type(node, self.xsd_ns).is_some()
    }
}
