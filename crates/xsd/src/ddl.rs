//! SQL DDL rendering.

use crate::model::{Column, SchemaModel, Table};
use indexmap::IndexSet;
use std::fmt;
use tracing::info;

/// Renders a `SchemaModel` as a DDL script for one domain.
#[derive(Debug, Clone)]
pub struct DdlAssembler {
    domain: String,
}

impl DdlAssembler {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Tables that make it into the script, in creation order.
    ///
    /// A table survives if it has a meaningful column, or if a surviving table
    /// references it through a foreign key.
    pub fn emitted_tables(&self, model: &SchemaModel) -> IndexSet<String> {
        let mut keep: IndexSet<&str> = model
            .tables()
            .filter(|t| t.has_meaningful_columns())
            .map(|t| t.name.as_str())
            .collect();

        loop {
            let referenced: Vec<&str> = keep
                .iter()
                .filter_map(|name| model.table(name))
                .flat_map(|t| t.columns.iter())
                .filter(|c| c.foreign_key)
                .filter_map(|c| c.references.as_deref())
                .filter(|parent| model.contains(parent) && !keep.contains(parent))
                .collect();
            if referenced.is_empty() {
                break;
            }
            keep.extend(referenced);
        }

        model
            .tables()
            .filter_map(|t| {
                if keep.contains(t.name.as_str()) {
                    Some(t.name.clone())
                } else {
                    info!(table = %t.name, "skipping table without content");
                    None
                }
            })
            .collect()
    }

    pub fn assemble(&self, model: &SchemaModel) -> String {
        let emitted = self.emitted_tables(model);
        Script {
            domain: &self.domain,
            model,
            emitted: &emitted,
        }
        .to_string()
    }
}

#[derive(Clone, Copy)]
struct Script<'a> {
    domain: &'a str,
    model: &'a SchemaModel,
    emitted: &'a IndexSet<String>,
}

impl<'a> Script<'a> {
    fn tables(self) -> impl Iterator<Item = &'a Table> + 'a {
        let emitted = self.emitted;
        self.model
            .tables()
            .filter(move |t| emitted.contains(&t.name))
    }

    /// Foreign keys whose target is emitted and has content of its own.
    fn constraints(self) -> impl Iterator<Item = (&'a Table, &'a Column)> + 'a {
        self.tables().flat_map(move |table| {
            table
                .columns
                .iter()
                .filter(move |column| column.foreign_key && self.is_valid_target(column))
                .map(move |column| (table, column))
        })
    }

    fn is_valid_target(self, column: &Column) -> bool {
        column
            .references
            .as_deref()
            .filter(|parent| self.emitted.contains(*parent))
            .and_then(|parent| self.model.table(parent))
            .is_some_and(Table::has_meaningful_columns)
    }
}

impl fmt::Display for Script<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- SQL DDL from XSD Schema (Domain: {})", self.domain)?;
        writeln!(f, "-- Generated by xsd2sql")?;
        writeln!(f)?;

        for table in self.tables() {
            writeln!(f, "CREATE TABLE {} (", table.name)?;
            for (i, column) in table.columns.iter().enumerate() {
                if i > 0 {
                    writeln!(f, ",")?;
                }
                write!(f, "    {} {}", column.name, column.sql_type())?;
                if column.is_required() && !column.is_choice() {
                    write!(f, " NOT NULL")?;
                }
                if column.primary_key {
                    write!(f, " PRIMARY KEY")?;
                }
            }
            writeln!(f)?;
            writeln!(f, ");")?;
            writeln!(f)?;
        }

        writeln!(f, "-- Foreign Key Constraints (Validated)")?;
        let mut count = 0;
        for (table, column) in self.constraints() {
            writeln!(
                f,
                "ALTER TABLE {t} ADD CONSTRAINT fk_{t}_{c} FOREIGN KEY ({c}) REFERENCES {p}(id);",
                t = table.name,
                c = column.name,
                p = column.references.as_deref().unwrap_or_default(),
            )?;
            count += 1;
        }
        if count == 0 {
            writeln!(f, "-- No valid foreign key constraints generated")?;
        } else {
            writeln!(f, "-- Generated {} valid foreign key constraints", count)?;
        }

        let groups: Vec<(&str, &[Vec<String>])> = self
            .model
            .choice_groups()
            .filter(|(table, _)| self.emitted.contains(*table))
            .collect();
        if !groups.is_empty() {
            writeln!(f)?;
            writeln!(f, "-- Choice Groups (mutually exclusive elements)")?;
            for (table, choices) in groups {
                for names in choices {
                    writeln!(
                        f,
                        "-- Table {}: Only one of [{}] should be populated",
                        table,
                        names.join(", ")
                    )?;
                }
            }
        }

        Ok(())
    }
}
