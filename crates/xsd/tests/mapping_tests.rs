//! Mapping tests against XSD fixtures
//!
//! Covers the structural decisions of the engine end to end:
//! - choice members become optional columns and are recorded as groups
//! - essential fields land after the id/FK prefix with the mandated type
//! - same-named elements under different parents become distinct tables
//! - domain detection and the generic fallback
//! - root synthesis for schemas with only complex type definitions

use xsd2sql::model::{Column, Table};
use xsd2sql::{MappingEngine, PluginRegistry, SchemaModel, SchemaTree};

fn fixture(name: &str) -> SchemaTree {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    SchemaTree::from_file(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path, e))
}

/// Route engine logs through the test harness; `RUST_LOG=debug` shows every
/// type resolution.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine() -> MappingEngine {
    init_tracing();
    MappingEngine::new(PluginRegistry::builtin().expect("builtin plugins"))
}

/// Map the invoice fixture with its shared type library.
fn map_invoice(domain: Option<&str>) -> SchemaModel {
    let main = fixture("nfe_invoice.xsd");
    let types = fixture("nfe_types.xsd");
    engine().map(&main, &[types], domain).expect("mapping failed")
}

fn find_table<'a>(model: &'a SchemaModel, name: &str) -> &'a Table {
    model.table(name).unwrap_or_else(|| {
        let names: Vec<&str> = model.tables().map(|t| t.name.as_str()).collect();
        panic!("table {} not found in {:?}", name, names)
    })
}

fn find_column<'a>(table: &'a Table, name: &str) -> &'a Column {
    table
        .column(name)
        .unwrap_or_else(|| panic!("column {}.{} not found", table.name, name))
}

fn column_names(table: &Table) -> Vec<&str> {
    table.columns.iter().map(|c| c.name.as_str()).collect()
}

// ============================================================================
// Tax document (NF-e) domain
// ============================================================================

#[test]
fn test_invoice_detects_nfe_domain() {
    let main = fixture("nfe_invoice.xsd");
    let conversion = engine().convert(&main, &[], None).unwrap();
    assert_eq!(conversion.domain, "nfe");
}

#[test]
fn test_emit_choice_columns() {
    let model = map_invoice(None);
    let emit = find_table(&model, "emit");

    eprintln!("emit columns: {:?}", column_names(emit));
    assert_eq!(
        column_names(emit),
        vec!["id", "infnfe_id", "CNPJ", "CPF", "xNome", "IE"]
    );

    let cnpj = find_column(emit, "CNPJ");
    assert_eq!(cnpj.sql_type(), "CHAR(14)");
    assert!(cnpj.is_choice());
    assert!(!cnpj.is_required());

    let cpf = find_column(emit, "CPF");
    assert_eq!(cpf.sql_type(), "CHAR(11)");
    assert!(!cpf.is_required());

    let x_nome = find_column(emit, "xNome");
    assert_eq!(x_nome.sql_type(), "VARCHAR(255)");
    assert!(x_nome.is_required());

    assert_eq!(
        model.choice_groups_for("emit"),
        &[vec!["CNPJ".to_string(), "CPF".to_string()]]
    );
}

#[test]
fn test_dest_essential_fields_follow_prefix() {
    let model = map_invoice(None);
    let dest = find_table(&model, "dest");

    assert_eq!(
        column_names(dest),
        vec!["id", "infnfe_id", "CNPJ", "CPF", "idEstrangeiro", "xNome"]
    );
    assert_eq!(find_column(dest, "idEstrangeiro").sql_type(), "VARCHAR(20)");
    assert!(find_column(dest, "idEstrangeiro").is_choice());
}

#[test]
fn test_identity_and_foreign_key_positions() {
    let model = map_invoice(None);
    for table in model.tables() {
        assert_eq!(table.columns[0].name, "id", "table {}", table.name);
        assert!(table.columns[0].primary_key);
        match &table.parent {
            Some(parent) => {
                let fk = &table.columns[1];
                assert!(fk.foreign_key, "table {}", table.name);
                assert_eq!(fk.name, format!("{}_id", parent.to_lowercase()));
                assert_eq!(fk.references.as_deref(), Some(parent.as_str()));
            }
            None => assert_eq!(table.name, "NFe"),
        }
    }
}

#[test]
fn test_endereco_collision_keeps_both_tables() {
    let model = map_invoice(None);

    let issuer = find_table(&model, "endereco");
    assert_eq!(issuer.parent.as_deref(), Some("emit"));
    assert_eq!(column_names(issuer), vec!["id", "emit_id", "xLgr", "CEP"]);

    let recipient = find_table(&model, "endereco_dest");
    assert_eq!(recipient.parent.as_deref(), Some("dest"));
    assert_eq!(
        column_names(recipient),
        vec!["id", "dest_id", "xLgr", "fone", "email"]
    );
}

#[test]
fn test_field_rules_and_type_library() {
    let model = map_invoice(None);

    let ide = find_table(&model, "ide");
    assert_eq!(find_column(ide, "cUF").sql_type(), "CHAR(2)");
    assert_eq!(find_column(ide, "nNF").sql_type(), "VARCHAR(255)");
    assert_eq!(find_column(ide, "dhEmi").sql_type(), "TIMESTAMP");
    assert_eq!(find_column(ide, "cMunFG").sql_type(), "CHAR(7)");

    let prod = find_table(&model, "prod");
    assert_eq!(find_column(prod, "cProd").sql_type(), "VARCHAR(60)");
    assert_eq!(find_column(prod, "cEAN").sql_type(), "VARCHAR(14)");
    assert_eq!(find_column(prod, "NCM").sql_type(), "VARCHAR(8)");
    assert_eq!(find_column(prod, "CFOP").sql_type(), "CHAR(4)");
    assert_eq!(find_column(prod, "qCom").sql_type(), "NUMERIC(15,4)");
    assert_eq!(find_column(prod, "vProd").sql_type(), "NUMERIC(15,2)");

    let recipient = find_table(&model, "endereco_dest");
    assert_eq!(find_column(recipient, "fone").sql_type(), "VARCHAR(20)");
    assert_eq!(find_column(recipient, "email").sql_type(), "VARCHAR(60)");
}

#[test]
fn test_type_library_is_optional() {
    let main = fixture("nfe_invoice.xsd");
    let model = engine().map(&main, &[], None).unwrap();
    let prod = find_table(&model, "prod");
    assert_eq!(find_column(prod, "cProd").sql_type(), "VARCHAR(255)");
}

#[test]
fn test_zero_length_restriction_uses_default_size() {
    let model = map_invoice(None);
    for table in model.tables() {
        for column in &table.columns {
            assert_ne!(column.sql_type(), "VARCHAR(0)", "{}.{}", table.name, column.name);
        }
    }

    let x_just = find_column(find_table(&model, "ide"), "xJust");
    assert_eq!(x_just.sql_type(), "VARCHAR(255)");
    assert!(!x_just.is_required());
}

#[test]
fn test_signature_is_never_mapped() {
    let model = map_invoice(None);
    assert!(model.table("Signature").is_none());
    assert!(model
        .tables()
        .all(|t| t.column("SignatureValue").is_none()));
}

#[test]
fn test_det_without_scalars_is_mapped_but_empty() {
    let model = map_invoice(None);
    let det = find_table(&model, "det");
    assert!(!det.has_meaningful_columns());
    assert_eq!(find_table(&model, "prod").parent.as_deref(), Some("det"));
    assert!(!find_table(&model, "ICMS").has_meaningful_columns());
}

// ============================================================================
// Generic domain
// ============================================================================

#[test]
fn test_forced_generic_domain_has_no_literal_rules() {
    let model = map_invoice(Some("generic"));

    let emit = find_table(&model, "emit");
    assert_eq!(column_names(emit), vec!["id", "infnfe_id", "CNPJ", "CPF", "xNome", "IE"]);
    // Only the configured {14} pattern rule applies
    assert_eq!(find_column(emit, "CNPJ").sql_type(), "CHAR(14)");
    assert_eq!(find_column(emit, "CPF").sql_type(), "VARCHAR(11)");
    assert_eq!(find_column(emit, "IE").sql_type(), "VARCHAR(255)");

    let dest = find_table(&model, "dest");
    assert_eq!(column_names(dest), vec!["id", "infnfe_id", "CNPJ", "CPF", "idEstrangeiro", "xNome"]);
    assert_eq!(find_column(dest, "idEstrangeiro").sql_type(), "VARCHAR(255)");

    // Signature blocks are only skipped by the tax-document plugin
    assert!(model.table("Signature").is_some());
}

#[test]
fn test_unknown_domain_falls_back_to_generic() {
    let main = fixture("library_catalog.xsd");
    let conversion = engine().convert(&main, &[], Some("insurance")).unwrap();
    assert_eq!(conversion.domain, "generic");

    let book = find_table(&conversion.model, "book");
    assert_eq!(find_column(book, "cnpj").sql_type(), "VARCHAR(255)");
    assert!(!find_column(book, "cnpj").is_required());
}

#[test]
fn test_catalog_types() {
    let main = fixture("library_catalog.xsd");
    let model = engine().map(&main, &[], None).unwrap();

    let book = find_table(&model, "book");
    assert_eq!(find_column(book, "isbn").sql_type(), "VARCHAR(13)");
    assert_eq!(find_column(book, "publisherId").sql_type(), "CHAR(14)");
    assert_eq!(find_column(book, "published").sql_type(), "DATE");
    assert_eq!(find_column(book, "pages").sql_type(), "INTEGER");
    assert_eq!(find_column(book, "price").sql_type(), "NUMERIC(15,2)");

    let catalog = find_table(&model, "catalog");
    assert_eq!(column_names(catalog), vec!["id", "name", "year"]);
    assert_eq!(find_column(catalog, "year").sql_type(), "CHAR(4)");
}

#[test]
fn test_same_name_under_different_paths() {
    let main = fixture("library_catalog.xsd");
    let model = engine().map(&main, &[], None).unwrap();

    assert_eq!(column_names(find_table(&model, "author")), vec!["id", "book_id", "name"]);
    assert_eq!(
        column_names(find_table(&model, "address")),
        vec!["id", "author_id", "street", "city"]
    );
    assert_eq!(
        column_names(find_table(&model, "address_catalog")),
        vec!["id", "catalog_id", "street", "city", "zip"]
    );
}

// ============================================================================
// Root synthesis
// ============================================================================

#[test]
fn test_complex_type_roots() {
    let main = fixture("event_types.xsd");
    let model = engine().map(&main, &[], None).unwrap();

    let names: Vec<&str> = model.tables().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["TEvento", "detEvento"]);

    assert_eq!(column_names(find_table(&model, "TEvento")), vec!["id", "cOrgao"]);
    let det_evento = find_table(&model, "detEvento");
    assert_eq!(column_names(det_evento), vec!["id", "tevento_id", "descEvento", "nSeq"]);
    assert_eq!(find_column(det_evento, "nSeq").sql_type(), "INTEGER");
    assert!(!find_column(det_evento, "nSeq").is_required());
}
