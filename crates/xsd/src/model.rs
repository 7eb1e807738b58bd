//! In-memory relational schema built by the mapping engine.

use crate::config::EssentialField;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Name of the synthetic primary key every table starts with.
pub const ID_COLUMN: &str = "id";

/// A database column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    sql_type: String,
    required: bool,
    max_length: Option<u32>,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub references: Option<String>,
    choice: bool,
    /// Injected from the domain's essential fields and not yet matched by a
    /// schema element.
    essential: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, required: bool) -> Self {
        let sql_type = sql_type.into();
        Self {
            name: name.into(),
            max_length: extract_max_length(&sql_type),
            sql_type,
            required,
            primary_key: false,
            foreign_key: false,
            references: None,
            choice: false,
            essential: false,
        }
    }

    /// The synthetic `id SERIAL` primary key.
    pub fn primary_key() -> Self {
        Self {
            primary_key: true,
            ..Self::new(ID_COLUMN, "SERIAL", true)
        }
    }

    /// `<parent>_id` linking a child table to `parent`.
    pub fn foreign_key(parent: &str) -> Self {
        Self {
            foreign_key: true,
            references: Some(parent.to_string()),
            ..Self::new(format!("{}_id", parent.to_lowercase()), "INTEGER", true)
        }
    }

    /// Mark the column as one branch of a choice group. Choice columns are
    /// mutually exclusive and therefore never required.
    pub fn into_choice(mut self) -> Self {
        self.choice = true;
        self.required = false;
        self
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn set_sql_type(&mut self, sql_type: impl Into<String>) {
        self.sql_type = sql_type.into();
        self.max_length = extract_max_length(&self.sql_type);
    }

    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_choice(&self) -> bool {
        self.choice
    }

    /// Neither the identity column nor a linkage column.
    pub fn is_meaningful(&self) -> bool {
        !(self.primary_key || self.foreign_key)
    }
}

/// Argument list of the first parenthesis, when it is a single number.
static LENGTH_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^(]*\(\s*(\d+)\s*\)").unwrap());

/// First `(n)` in a type string: `VARCHAR(60)` gives 60, `NUMERIC(15,2)` none.
pub fn extract_max_length(sql_type: &str) -> Option<u32> {
    LENGTH_ARGUMENT
        .captures(sql_type)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// A database table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub parent: Option<String>,
}

impl Table {
    /// New table with its identity column and, if nested, the parent link.
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        let mut columns = vec![Column::primary_key()];
        if let Some(parent) = parent {
            columns.push(Column::foreign_key(parent));
        }
        Self {
            name: name.into(),
            columns,
            parent: parent.map(str::to_string),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_meaningful_columns(&self) -> bool {
        self.columns.iter().any(Column::is_meaningful)
    }

    pub fn meaningful_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_meaningful())
    }

    /// Position right after the identity column and any foreign keys that
    /// directly follow it.
    pub fn identity_prefix_len(&self) -> usize {
        let mut position = 1.min(self.columns.len());
        for column in self.columns.iter().skip(1) {
            if !column.foreign_key {
                break;
            }
            position += 1;
        }
        position
    }

    /// Append a column. A column with an existing name is not added again; it
    /// keeps its position and type. A choice member turns the existing column
    /// into a choice column, and the first element matching an injected
    /// essential field decides whether it is required.
    pub fn push_column(&mut self, column: Column) -> bool {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == column.name) {
            if column.choice && !existing.choice {
                debug!(table = %self.name, column = %column.name, "marking existing column as choice");
                existing.choice = true;
                existing.required = false;
            } else if existing.essential {
                debug!(
                    table = %self.name,
                    column = %column.name,
                    required = column.required,
                    "essential field matched by schema element"
                );
                existing.required = column.required && !existing.choice;
            } else {
                warn!(table = %self.name, column = %column.name, "duplicate column ignored");
            }
            existing.essential = false;
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Reconcile domain-mandated columns with what structural mapping produced.
    ///
    /// An existing column keeps its position and gets the mandated type; a
    /// missing one is inserted after the identity/foreign-key prefix, ahead of
    /// all business columns. Running this twice is a no-op.
    pub fn apply_essential_fields(&mut self, fields: &[EssentialField]) {
        let mut position = self.identity_prefix_len();
        for field in fields {
            if let Some(existing) = self.columns.iter_mut().find(|c| c.name == field.name) {
                if existing.sql_type != field.sql_type {
                    debug!(
                        table = %self.name,
                        column = %field.name,
                        from = %existing.sql_type,
                        to = %field.sql_type,
                        "correcting essential field type"
                    );
                    existing.set_sql_type(field.sql_type.clone());
                }
                continue;
            }

            debug!(table = %self.name, column = %field.name, position, "adding essential field");
            self.columns.insert(
                position,
                Column {
                    essential: true,
                    ..Column::new(field.name.clone(), field.sql_type.clone(), field.required)
                },
            );
            position += 1;
        }
    }
}

/// Tables and choice groups produced by one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaModel {
    tables: IndexMap<String, Table>,
    choice_groups: IndexMap<String, Vec<Vec<String>>>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Create a table, resolving name collisions by suffixing the parent's
    /// name (or `_root`), then a counter. Returns the final name.
    pub fn create_table(&mut self, name: &str, parent: Option<&str>) -> String {
        let mut final_name = name.to_string();
        if self.tables.contains_key(&final_name) {
            let base = format!("{}_{}", name, parent.unwrap_or("root"));
            final_name = base.clone();
            let mut counter = 2;
            while self.tables.contains_key(&final_name) {
                final_name = format!("{}_{}", base, counter);
                counter += 1;
            }
        }

        self.tables
            .insert(final_name.clone(), Table::new(final_name.clone(), parent));
        final_name
    }

    /// Append a column to `table`. A missing table is logged and ignored.
    pub fn add_column(&mut self, table: &str, column: Column) -> bool {
        match self.tables.get_mut(table) {
            Some(target) => target.push_column(column),
            None => {
                warn!(table, column = %column.name, "table not found for column");
                false
            }
        }
    }

    pub fn record_choice_group(&mut self, table: &str, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        self.choice_groups
            .entry(table.to_string())
            .or_default()
            .push(names);
    }

    pub fn choice_groups(&self) -> impl Iterator<Item = (&str, &[Vec<String>])> {
        self.choice_groups
            .iter()
            .map(|(table, groups)| (table.as_str(), groups.as_slice()))
    }

    pub fn choice_groups_for(&self, table: &str) -> &[Vec<String>] {
        self.choice_groups
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
