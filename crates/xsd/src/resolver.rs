//! Column type resolution.
//!
//! Stages, first match wins:
//!
//! 1. plugin field override (by column name)
//! 2. plugin custom mapping (by declared type name)
//! 3. restriction facets (`maxLength`, `totalDigits`, `pattern`)
//! 4. inference from the declared type name
//! 5. configured default `VARCHAR(n)`
//!
//! The result is never `VARCHAR(0)`.

use crate::config::{DomainConfig, TypeDefaults};
use crate::model::extract_max_length;
use crate::plugin::DomainPlugin;
use crate::tree::{Node, SchemaTree};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// A pattern that is a single character class repeated a fixed number of
/// times: `[0-9]{14}`, `\d{8}`, `.{3}`.
static REPETITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\[[^\]]+\]|\\[dDwW]|\.)\{(\d+)\}$").unwrap());

/// Which stage produced a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    FieldOverride,
    CustomMapping,
    Restriction,
    Inference,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub sql_type: String,
    pub max_length: Option<u32>,
    pub source: TypeSource,
}

/// Top-level named simple types of the main schema and any auxiliary type
/// schemas, keyed by local name. The first definition of a name wins.
#[derive(Debug, Default)]
pub struct TypeLibrary<'t> {
    simple_types: HashMap<&'t str, Node<'t>>,
}

impl<'t> TypeLibrary<'t> {
    pub fn build<I>(trees: I, xsd_ns: &str) -> Self
    where
        I: IntoIterator<Item = &'t SchemaTree>,
    {
        let mut simple_types = HashMap::new();
        for tree in trees {
            for node in tree.root().children() {
                if !node.is(xsd_ns, "simpleType") {
                    continue;
                }
                if let Some(name) = node.name() {
                    simple_types.entry(name).or_insert(node);
                }
            }
        }
        Self { simple_types }
    }

    pub fn simple_type(&self, declared: &str) -> Option<Node<'t>> {
        self.simple_types.get(local_part(declared)).copied()
    }

    pub fn len(&self) -> usize {
        self.simple_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simple_types.is_empty()
    }
}

/// Strip a namespace prefix or Clark namespace: `nfe:TCnpj` and
/// `{urn:x}TCnpj` both give `TCnpj`.
pub fn local_part(name: &str) -> &str {
    let name = name.rsplit('}').next().unwrap_or(name);
    name.rsplit(':').next().unwrap_or(name)
}

/// The declared type of an element: its `type` attribute, or the base of an
/// inline `simpleContent` extension/restriction.
pub fn declared_type<'t>(element: Node<'t>, xsd_ns: &str) -> Option<&'t str> {
    if let Some(ty) = element.attribute("type") {
        return Some(ty);
    }
    element
        .find_first_scoped(xsd_ns, "simpleContent")?
        .children()
        .find(|c| c.is_any(xsd_ns, &["extension", "restriction"]))?
        .attribute("base")
}

fn is_decimal_like(name: &str) -> bool {
    let local = local_part(name);
    local.contains("TDec") || local.to_lowercase().contains("decimal")
}

/// Heuristic mapping from a declared type name.
pub fn infer_from_type_name(name: &str, config: &DomainConfig) -> Option<String> {
    let local = local_part(name);
    let lower = local.to_lowercase();
    let defaults = &config.defaults;

    if is_decimal_like(name) {
        let sql = config
            .decimal_codes
            .iter()
            .find(|(code, _)| local.contains(code.as_str()))
            .map(|(_, [precision, scale])| format!("NUMERIC({},{})", precision, scale))
            .unwrap_or_else(|| defaults.numeric());
        return Some(sql);
    }
    if local.contains("TString") || lower.contains("string") {
        return Some(defaults.varchar());
    }
    if lower.contains("timestamp") || lower.contains("datetime") {
        return Some("TIMESTAMP".to_string());
    }
    if lower.contains("date") {
        return Some("DATE".to_string());
    }
    if lower.contains("integer") {
        return Some("INTEGER".to_string());
    }

    let builtin = match local {
        "int" | "long" | "short" | "byte" | "unsignedInt" | "unsignedLong" | "unsignedShort"
        | "unsignedByte" => "INTEGER",
        "boolean" => "BOOLEAN",
        "float" | "double" => "DOUBLE PRECISION",
        _ => return None,
    };
    Some(builtin.to_string())
}

/// Rewrite a degenerate `VARCHAR(0)` to the default size.
pub fn guard_degenerate(sql_type: String, defaults: &TypeDefaults) -> String {
    if sql_type.replace(' ', "") == "VARCHAR(0)" {
        defaults.varchar()
    } else {
        sql_type
    }
}

/// Length of a fixed-width pattern facet. Patterns with several atoms or a
/// ranged count (`[1-9]{1}[0-9]{0,8}`) give `None`.
pub fn repetition_count(pattern: &str) -> Option<u32> {
    REPETITION
        .captures(pattern)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub struct TypeResolver<'a, 't> {
    plugin: &'a dyn DomainPlugin,
    library: &'a TypeLibrary<'t>,
}

impl<'a, 't> TypeResolver<'a, 't> {
    pub fn new(plugin: &'a dyn DomainPlugin, library: &'a TypeLibrary<'t>) -> Self {
        Self { plugin, library }
    }

    fn config(&self) -> &'a DomainConfig {
        self.plugin.config()
    }

    pub fn resolve(&self, element: Node<'_>) -> ResolvedType {
        let config = self.config();
        let ns = config.xsd_namespace.as_str();
        let column = element.name().unwrap_or_default();
        let declared = declared_type(element, ns);

        let (sql_type, source) = if let Some(sql) = self.plugin.field_override(column) {
            (sql, TypeSource::FieldOverride)
        } else if let Some(sql) = declared.and_then(|d| self.custom_mapping(d)) {
            (sql, TypeSource::CustomMapping)
        } else if let Some(sql) = self.from_restriction(element, declared) {
            (sql, TypeSource::Restriction)
        } else if let Some(sql) = declared.and_then(|d| infer_from_type_name(d, config)) {
            (sql, TypeSource::Inference)
        } else {
            (config.defaults.varchar(), TypeSource::Default)
        };

        let sql_type = guard_degenerate(sql_type, &config.defaults);
        debug!(column, declared = ?declared, sql_type = %sql_type, ?source, "resolved column type");

        ResolvedType {
            max_length: extract_max_length(&sql_type),
            sql_type,
            source,
        }
    }

    fn custom_mapping(&self, declared: &str) -> Option<String> {
        self.plugin.custom_type_mapping(declared).or_else(|| {
            let local = local_part(declared);
            (local != declared)
                .then(|| self.plugin.custom_type_mapping(local))
                .flatten()
        })
    }

    /// Stage 3. Falls through (`None`) when the restriction yields nothing
    /// beyond the default varchar.
    fn from_restriction(&self, element: Node<'_>, declared: Option<&str>) -> Option<String> {
        let config = self.config();
        let ns = config.xsd_namespace.as_str();

        let inline = element
            .children()
            .find(|c| c.is(ns, "simpleType"))
            .and_then(|st| st.children().find(|c| c.is(ns, "restriction")));
        let restriction = match inline {
            Some(restriction) => restriction,
            None => self
                .library
                .simple_type(declared?)?
                .children()
                .find(|c| c.is(ns, "restriction"))?,
        };

        let facet = |local: &str| {
            restriction
                .children()
                .find(|c| c.is(ns, local))
                .and_then(|f| f.attribute("value"))
                .and_then(|v| v.trim().parse::<u32>().ok())
        };

        let default = config.defaults.varchar();
        let base = restriction.attribute("base").unwrap_or_default();
        let mut sql = self
            .custom_mapping(base)
            .or_else(|| infer_from_type_name(base, config))
            .unwrap_or_else(|| default.clone());

        let max_length = facet("maxLength");
        if let Some(n) = max_length {
            if sql.starts_with("VARCHAR") {
                sql = format!("VARCHAR({})", n);
            }
        }

        if is_decimal_like(base) {
            if let Some(total) = facet("totalDigits") {
                let fraction = facet("fractionDigits").unwrap_or(0);
                sql = format!("NUMERIC({},{})", total, fraction);
            }
        }

        let patterns: Vec<&str> = restriction
            .children()
            .filter(|c| c.is(ns, "pattern"))
            .filter_map(|c| c.attribute("value"))
            .collect();

        if let Some(rule) = self
            .plugin
            .pattern_rules()
            .iter()
            .find(|rule| patterns.iter().any(|p| rule.matches(p)))
        {
            sql = rule.sql_type.clone();
        }

        if max_length.is_none() {
            if let Some(n) = patterns.iter().find_map(|p| repetition_count(p)) {
                if sql.starts_with("VARCHAR") {
                    sql = format!("VARCHAR({})", n);
                }
            }
        }

        let sql = guard_degenerate(sql, &config.defaults);
        (sql != default).then_some(sql)
    }
}
