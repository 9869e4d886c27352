//! aps-tabular CLI - convert USPTO APS patent text files to CSV, NDJSON or SQLite

use aps_tabular::{load_schema, Converter, ConverterConfig, OutputType};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aps-tabular")]
#[command(version, about = "Convert USPTO APS full-text patent files into relational tables", long_about = None)]
struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert APS text files using a field-mapping schema
    Convert {
        /// Input file, directory or glob expression (repeatable)
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<String>,

        /// Search directories recursively for .txt files
        #[arg(short, long)]
        recurse: bool,

        /// Field-mapping schema (YAML)
        #[arg(short, long, default_value = "config/aps_fields.yaml")]
        config: PathBuf,

        /// Output directory, created if necessary
        #[arg(short, long, default_value = "output")]
        output_path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputType::Csv)]
        output_type: OutputType,

        /// Empty the output directory before converting
        #[arg(long)]
        clean: bool,

        /// Joiner for repeated fields whose rule does not name one
        #[arg(short, long, default_value = aps_tabular::schema::DEFAULT_JOINER)]
        joiner: String,

        /// Header tag that starts each patent document
        #[arg(long, default_value = "PATN")]
        root_marker: String,

        /// Rows per SQLite INSERT statement
        #[arg(long, default_value_t = 20)]
        batch_size: usize,

        /// YAML file of records to ignore, replacing the built-in list
        #[arg(long)]
        ignore_list: Option<PathBuf>,
    },

    /// Convert using a YAML settings file with the same fields as `convert`
    Run {
        /// Settings file (YAML)
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Compile a schema and print the tables it produces
    Validate {
        /// Field-mapping schema (YAML)
        #[arg(short, long, default_value = "config/aps_fields.yaml")]
        config: PathBuf,

        /// Header tag that starts each patent document
        #[arg(long, default_value = "PATN")]
        root_marker: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert {
            inputs,
            recurse,
            config,
            output_path,
            output_type,
            clean,
            joiner,
            root_marker,
            batch_size,
            ignore_list,
        } => {
            let config = ConverterConfig {
                inputs,
                recurse,
                schema_path: config,
                output_path,
                output_type,
                clean,
                joiner,
                root_marker,
                batch_size,
                ignore_list,
            };
            convert(config)
        }
        Commands::Run { settings } => ConverterConfig::from_file(&settings).and_then(convert),
        Commands::Validate {
            config,
            root_marker,
        } => validate_schema(&config, &root_marker),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over the verbosity flags
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn convert(config: ConverterConfig) -> aps_tabular::Result<()> {
    let output_path = config.output_path.clone();
    let converter = Converter::new(config)?;
    let summary = converter.convert()?;

    println!(
        "Converted {} documents from {} files into {}",
        summary.documents,
        summary.files,
        output_path.display()
    );
    for (entity, rows) in &summary.rows {
        println!("  {:<32} {:>10}", entity, rows);
    }
    if summary.dropped > 0 {
        println!("  {} ignored rows dropped", summary.dropped);
    }
    Ok(())
}

fn validate_schema(path: &Path, root_marker: &str) -> aps_tabular::Result<()> {
    let schema = load_schema(path, root_marker)?;

    println!("✓ Schema {} is valid", path.display());
    println!(
        "  Root entity '{}' keyed by '{}'",
        schema.root_entity(),
        schema.primary_key_tag()
    );
    for entity in schema.entities() {
        println!("  {}: {}", entity.name, entity.columns.join(", "));
    }
    Ok(())
}
