mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xsd2sql::{Conversion, DdlAssembler, MappingEngine, PluginRegistry, SchemaTree};

#[derive(Parser)]
#[command(name = "xsd2sql")]
#[command(about = "Convert XSD schemas into relational SQL DDL", long_about = None)]
#[command(version)]
struct Cli {
    /// Main XSD schema
    schema: PathBuf,

    /// Additional XSD files with shared simple type definitions
    type_files: Vec<PathBuf>,

    /// Domain to use (auto-detected if not specified)
    #[arg(long, env = "XSD2SQL_DOMAIN")]
    domain: Option<String>,

    /// Directory with domain descriptors (*.toml, *.json)
    #[arg(long, env = "XSD2SQL_CONFIG_DIR", default_value = "config/domains")]
    config_dir: PathBuf,

    /// Output file (defaults to <schema>_schema_generalized.sql next to the schema)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the summary
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    if !cli.schema.exists() {
        bail!("Main XSD file not found: {:?}", cli.schema);
    }
    for path in &cli.type_files {
        if !path.exists() {
            bail!("Type XSD file not found: {:?}", path);
        }
    }

    let configs = config::load_domain_configs(&cli.config_dir)?;
    let registry = PluginRegistry::from_configs(configs).context("Failed to build domain plugins")?;
    info!(domains = ?registry.domains().collect::<Vec<_>>(), "registered domains");
    let engine = MappingEngine::new(registry);

    let main = SchemaTree::from_file(&cli.schema)
        .with_context(|| format!("Failed to parse schema: {:?}", cli.schema))?;
    let aux = cli
        .type_files
        .iter()
        .map(|path| {
            SchemaTree::from_file(path).with_context(|| format!("Failed to parse type schema: {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;

    let conversion = engine
        .convert(&main, &aux, cli.domain.as_deref())
        .context("Conversion failed")?;

    let output = cli.output.unwrap_or_else(|| default_output_path(&cli.schema));
    fs::write(&output, &conversion.ddl)
        .with_context(|| format!("Failed to write SQL schema: {:?}", output))?;

    print_summary(&conversion, &output);
    Ok(())
}

/// `<dir>/<stem>_schema_generalized.sql` beside the schema.
fn default_output_path(schema: &Path) -> PathBuf {
    let stem = schema
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    schema.with_file_name(format!("{}_schema_generalized.sql", stem))
}

fn print_summary(conversion: &Conversion, output: &Path) {
    let mut emitted: Vec<String> = DdlAssembler::new(conversion.domain.as_str())
        .emitted_tables(&conversion.model)
        .into_iter()
        .collect();
    emitted.sort();

    println!("Active domain: {}", conversion.domain);
    println!("SQL schema written to: {}", output.display());
    println!(
        "Generated {} tables ({} mapped)",
        emitted.len(),
        conversion.model.len()
    );
    for name in &emitted {
        if let Some(table) = conversion.model.table(name) {
            let choices = table.columns.iter().filter(|c| c.is_choice()).count();
            println!(
                "  - {} ({} meaningful columns, {} choice columns)",
                name,
                table.meaningful_columns().count(),
                choices
            );
        }
    }
}
