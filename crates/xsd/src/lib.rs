//! # xsd2sql
//!
//! Domain-aware XSD to SQL DDL converter.
//!
//! This crate walks an XML Schema document and infers a relational schema from
//! its structure: which elements become tables, which become columns, what SQL
//! type each column gets, and how tables reference each other. Domain plugins
//! can override naming, typing and table-creation decisions.
//!
//! ## Architecture
//!
//! 1. **Parse XSD** - `tree` turns the document into an owned labeled tree
//! 2. **Index** - `context` records parent links for choice detection
//! 3. **Map** - `engine` drives `classifier`, `resolver` and the active `plugin`
//!    to build a `model::SchemaModel`
//! 4. **Emit** - `ddl` prunes content-free tables and renders the DDL text
//!
//! ## Usage
//!
//! ```no_run
//! use xsd2sql::engine::MappingEngine;
//! use xsd2sql::plugin::PluginRegistry;
//! use xsd2sql::tree::SchemaTree;
//!
//! let tree = SchemaTree::from_file("leiauteNFe.xsd")?;
//! let engine = MappingEngine::new(PluginRegistry::builtin()?);
//!
//! // Auto-detect the domain and render DDL
//! let conversion = engine.convert(&tree, &[], None)?;
//! println!("{}", conversion.ddl);
//! # Ok::<(), xsd2sql::Error>(())
//! ```

pub mod classifier;
pub mod config;
pub mod context;
pub mod ddl;
pub mod engine;
pub mod model;
pub mod plugin;
pub mod resolver;
pub mod tree;

use thiserror::Error;

pub use config::DomainConfig;
pub use ddl::DdlAssembler;
pub use engine::{Conversion, MappingEngine};
pub use model::{Column, SchemaModel, Table};
pub use plugin::{DomainPlugin, PluginRegistry};
pub use tree::SchemaTree;

#[derive(Debug, Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern rule '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_message() {
        let source = regex::Regex::new("[0-9").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "[0-9".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid pattern rule '[0-9'"));
    }
}
