use super::{DomainPlugin, PluginContext};
use crate::classifier;
use crate::config::{DomainConfig, PatternRule};
use crate::tree::Node;
use crate::Result;
use tracing::debug;

/// XML-DSig blocks embedded in NF-e documents; never mapped.
const SIGNATURE_ELEMENTS: &[&str] = &["Signature", "SignedInfo", "SignatureValue"];

/// Short identifiers that look structured in some layouts but are scalars.
const SCALAR_ELEMENTS: &[&str] = &["CPF", "CNPJ", "IE", "email", "fone", "CEP"];

const LITERAL_FIELDS: &[(&str, &str)] = &[
    ("NCM", "VARCHAR(8)"),
    ("cEAN", "VARCHAR(14)"),
    ("cEANTrib", "VARCHAR(14)"),
    ("CFOP", "CHAR(4)"),
    ("idEstrangeiro", "VARCHAR(20)"),
    ("placa", "VARCHAR(7)"),
    ("IE", "VARCHAR(14)"),
];

/// Case-insensitive substrings of column names with a fixed format.
const FIELD_PATTERNS: &[(&str, &str)] = &[
    ("cnpj", "CHAR(14)"),
    ("cpf", "CHAR(11)"),
    ("cmun", "CHAR(7)"),
    ("cuf", "CHAR(2)"),
    ("cep", "CHAR(8)"),
    ("telefone", "VARCHAR(20)"),
    ("fone", "VARCHAR(20)"),
    ("email", "VARCHAR(60)"),
];

/// Brazilian electronic invoice (NF-e) rules layered over the generic
/// behaviour.
#[derive(Debug, Clone)]
pub struct NfePlugin {
    config: DomainConfig,
    rules: Vec<PatternRule>,
}

impl NfePlugin {
    pub fn new(config: DomainConfig) -> Result<Self> {
        let rules = config.pattern_rules()?;
        Ok(Self { config, rules })
    }
}

impl DomainPlugin for NfePlugin {
    fn domain_name(&self) -> &str {
        "nfe"
    }

    fn config(&self) -> &DomainConfig {
        &self.config
    }

    fn pattern_rules(&self) -> &[PatternRule] {
        &self.rules
    }

    fn pre_process<'t>(&self, node: Node<'t>, _ctx: &PluginContext<'_>) -> Option<Node<'t>> {
        match node.name() {
            Some(name) if SIGNATURE_ELEMENTS.contains(&name) => {
                debug!(element = name, "skipping signature element");
                None
            }
            _ => Some(node),
        }
    }

    fn field_override(&self, column: &str) -> Option<String> {
        if let Some(sql) = self.config.field_overrides.get(column) {
            return Some(sql.clone());
        }

        if let Some((_, sql)) = LITERAL_FIELDS.iter().find(|(name, _)| *name == column) {
            return Some(sql.to_string());
        }

        let lower = column.to_lowercase();
        FIELD_PATTERNS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, sql)| sql.to_string())
    }

    fn should_create_table(&self, node: Node<'_>, _parent_table: Option<&str>) -> bool {
        if node.name().is_some_and(|name| SCALAR_ELEMENTS.contains(&name)) {
            return false;
        }
        classifier::is_table(node, &self.config.xsd_namespace)
    }
}
