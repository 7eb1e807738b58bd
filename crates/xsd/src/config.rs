//! Domain descriptors.
//!
//! A `DomainConfig` is pure data: default sizes, pattern rules, type and field
//! overrides, essential fields and detection indicators for one domain.
//! Loading descriptors from disk is the caller's business; this module only
//! knows how to deserialize them and ships the two built-in presets.

use crate::tree::XSD_NAMESPACE;
use crate::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub domain: String,
    pub defaults: TypeDefaults,
    /// Precision/scale pairs keyed by a code embedded in decimal type names,
    /// e.g. `"1104" -> [15, 4]` for `TDec_1104v`. First matching code wins.
    pub decimal_codes: IndexMap<String, [u32; 2]>,
    pub pattern_mappings: Vec<PatternMapping>,
    pub custom_types: IndexMap<String, String>,
    pub field_overrides: IndexMap<String, String>,
    pub essential_fields: IndexMap<String, Vec<EssentialField>>,
    pub namespace_indicators: Vec<String>,
    pub root_element_indicators: Vec<String>,
    pub root_complex_type_prefixes: Vec<String>,
    pub xsd_namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDefaults {
    pub string_size: u32,
    pub numeric_precision: u32,
    pub numeric_scale: u32,
}

impl Default for TypeDefaults {
    fn default() -> Self {
        Self {
            string_size: 255,
            numeric_precision: 15,
            numeric_scale: 2,
        }
    }
}

impl TypeDefaults {
    pub fn varchar(&self) -> String {
        format!("VARCHAR({})", self.string_size)
    }

    pub fn numeric(&self) -> String {
        format!("NUMERIC({},{})", self.numeric_precision, self.numeric_scale)
    }
}

/// A regular expression tested against declared `pattern` facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMapping {
    pub pattern: String,
    pub sql_type: String,
}

/// A column a domain requires on a given table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssentialField {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default)]
    pub required: bool,
}

impl EssentialField {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            required,
        }
    }
}

/// Compiled form of a `PatternMapping`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub regex: Regex,
    pub sql_type: String,
}

impl PatternRule {
    pub fn matches(&self, pattern_value: &str) -> bool {
        self.regex.is_match(pattern_value)
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            domain: "generic".to_string(),
            defaults: TypeDefaults::default(),
            decimal_codes: IndexMap::new(),
            pattern_mappings: Vec::new(),
            custom_types: IndexMap::new(),
            field_overrides: IndexMap::new(),
            essential_fields: IndexMap::new(),
            namespace_indicators: Vec::new(),
            root_element_indicators: Vec::new(),
            root_complex_type_prefixes: vec!["T".to_string()],
            xsd_namespace: XSD_NAMESPACE.to_string(),
        }
    }
}

impl DomainConfig {
    /// Parse a JSON descriptor.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Built-in descriptor used when nothing claims a schema.
    pub fn generic() -> Self {
        Self {
            pattern_mappings: vec![
                PatternMapping::new(r"\[0-9\]\{4\}", "CHAR(4)"),
                PatternMapping::new(r"\[0-9\]\{14\}", "CHAR(14)"),
            ],
            ..Self::default()
        }
    }

    /// Built-in descriptor for Brazilian electronic invoices (NF-e).
    pub fn nfe() -> Self {
        let decimal_codes = [
            ("0302", [5, 4]),
            ("0504", [5, 4]),
            ("0803", [11, 3]),
            ("1104", [15, 4]),
            ("1110", [21, 10]),
            ("1203", [15, 3]),
            ("1204", [16, 4]),
            ("1302", [15, 2]),
        ]
        .into_iter()
        .map(|(code, pair)| (code.to_string(), pair))
        .collect();

        let custom_types = [
            ("TDec_0302Max100", "NUMERIC(5,2)"),
            ("TDec_0302a04Max100", "NUMERIC(5,4)"),
            ("TCodUfIBGE", "CHAR(2)"),
            ("TCodMunIBGE", "CHAR(7)"),
            ("TChNFe", "CHAR(44)"),
            ("TDateTimeUTC", "TIMESTAMP"),
            ("TData", "DATE"),
        ]
        .into_iter()
        .map(|(name, sql)| (name.to_string(), sql.to_string()))
        .collect();

        let essential_fields = [
            (
                "emit",
                vec![
                    EssentialField::new("CNPJ", "CHAR(14)", false),
                    EssentialField::new("CPF", "CHAR(11)", false),
                ],
            ),
            (
                "dest",
                vec![
                    EssentialField::new("CNPJ", "CHAR(14)", false),
                    EssentialField::new("CPF", "CHAR(11)", false),
                    EssentialField::new("idEstrangeiro", "VARCHAR(20)", false),
                ],
            ),
        ]
        .into_iter()
        .map(|(table, fields)| (table.to_string(), fields))
        .collect();

        Self {
            domain: "nfe".to_string(),
            decimal_codes,
            pattern_mappings: vec![
                PatternMapping::new(r"\[0-9\]\{4\}", "CHAR(4)"),
                PatternMapping::new(r"\[0-9\]\{7\}", "CHAR(7)"),
                PatternMapping::new(r"\[0-9\]\{8\}", "CHAR(8)"),
                PatternMapping::new(r"\[0-9\]\{11\}", "CHAR(11)"),
                PatternMapping::new(r"\[0-9\]\{14\}", "CHAR(14)"),
                PatternMapping::new(r"\[0-9\]\{44\}", "CHAR(44)"),
            ],
            custom_types,
            essential_fields,
            namespace_indicators: vec!["http://www.portalfiscal.inf.br/nfe".to_string()],
            root_element_indicators: ["NFe", "nfeProc", "enviNFe", "TNFe"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Self::default()
        }
    }

    /// Compile `pattern_mappings` in declaration order.
    pub fn pattern_rules(&self) -> Result<Vec<PatternRule>> {
        self.pattern_mappings
            .iter()
            .map(|mapping| {
                let regex = Regex::new(&mapping.pattern).map_err(|source| Error::InvalidPattern {
                    pattern: mapping.pattern.clone(),
                    source,
                })?;
                Ok(PatternRule {
                    regex,
                    sql_type: mapping.sql_type.clone(),
                })
            })
            .collect()
    }

    pub fn essential_fields_for(&self, table: &str) -> &[EssentialField] {
        self.essential_fields
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl PatternMapping {
    pub fn new(pattern: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            sql_type: sql_type.into(),
        }
    }
}
