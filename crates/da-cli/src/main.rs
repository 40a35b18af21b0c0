//! DA Table Viewer CLI
//!
//! Command-line tool for decoding 2DA tables, resolving TLK string references,
//! and exporting tables as CSV or JSON.

use clap::{Parser, Subcommand};
use da_core::loader::table_kind;
use da_core::{
    decode_with_report, export_csv, scan_directory, to_csv, to_json, Config, DirectoryFetcher,
    ResolverStatus, StringResolver, StringTable, TableData, TableLoader,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "da-cli")]
#[command(about = "2DA Table Viewer", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single 2DA file
    Decode {
        /// Path to 2DA file
        #[arg(short, long)]
        file: PathBuf,

        /// Directory holding the TLK string tables
        #[arg(short, long)]
        tlk_dir: Option<PathBuf>,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve string references
    Resolve {
        /// Directory holding the TLK string tables
        #[arg(short, long)]
        tlk_dir: PathBuf,

        /// References to resolve
        #[arg(required = true)]
        refs: Vec<String>,
    },

    /// Scan directories for 2DA files
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Show the file behind each table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decode every 2DA file under a directory and write one CSV per table
    Export {
        /// Root directory to scan
        #[arg(short, long)]
        root: PathBuf,

        /// Directory holding the TLK string tables (defaults to the root)
        #[arg(short, long)]
        tlk_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> da_core::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Decode {
            file,
            tlk_dir,
            format,
            output,
        } => cmd_decode(&config, &file, tlk_dir.as_deref(), &format, output.as_deref()).await,
        Commands::Resolve { tlk_dir, refs } => cmd_resolve(&config, &tlk_dir, &refs).await,
        Commands::Scan { root, verbose } => cmd_scan(&config, &root, verbose),
        Commands::Export {
            root,
            tlk_dir,
            output,
        } => cmd_export(config, &root, tlk_dir.as_deref(), &output).await,
    }
}

/// Build a resolver over the TLK files in `tlk_dir` and wait for it to load
async fn open_resolver(config: &Config, tlk_dir: &Path) -> StringResolver {
    let resolver = StringResolver::new(
        Arc::new(DirectoryFetcher::new(tlk_dir)),
        config.string_tables.standard.clone(),
        config.string_tables.custom.clone(),
    );

    if resolver.ensure_ready().await == ResolverStatus::ReadyWithFallback {
        warn!(
            dir = %tlk_dir.display(),
            "string tables could not be loaded; references will stay numeric"
        );
    }
    resolver
}

async fn cmd_decode(
    config: &Config,
    file: &Path,
    tlk_dir: Option<&Path>,
    format: &str,
    output: Option<&Path>,
) -> da_core::Result<()> {
    let bytes = fs::read(file).map_err(|e| da_core::Error::FileRead {
        path: file.to_path_buf(),
        source: e,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let resolver = match tlk_dir {
        Some(dir) => open_resolver(config, dir).await,
        None => StringResolver::settled(StringTable::new(), StringTable::new()),
    };

    let file_name = file.to_string_lossy();
    let kind = table_kind(&file_name);
    let roles = config.column_roles.for_table(kind);
    let report = decode_with_report(&text, &roles, &resolver);

    let rendered = match format.to_lowercase().as_str() {
        "csv" => to_csv(&report.table, kind),
        "json" => to_json(&report.table)?,
        _ => {
            eprintln!("Unknown format: {}. Supported formats: csv, json", format);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!(
                "Decoded {} rows ({} skipped) to {}",
                report.table.row_count(),
                report.skipped_rows,
                path.display()
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn cmd_resolve(config: &Config, tlk_dir: &Path, refs: &[String]) -> da_core::Result<()> {
    let resolver = open_resolver(config, tlk_dir).await;

    for reference in refs {
        println!("{}\t{}", reference, resolver.resolve(reference));
    }

    Ok(())
}

fn cmd_scan(config: &Config, roots: &[PathBuf], verbose: bool) -> da_core::Result<()> {
    let result = scan_directory(roots, &config.table_extension)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!(
        "Found {} files, {} tables:",
        result.total_files,
        result.tables.len()
    );

    for table in &result.tables {
        if verbose {
            println!("  {} ({})", table.name, table.path.display());
        } else {
            println!("  {}", table.name);
        }
    }

    Ok(())
}

async fn cmd_export(
    config: Config,
    root: &Path,
    tlk_dir: Option<&Path>,
    output: &Path,
) -> da_core::Result<()> {
    let scan_result = scan_directory(&[root], &config.table_extension)?;
    info!(tables = scan_result.tables.len(), "exporting");

    let tlk_fetcher = Arc::new(DirectoryFetcher::new(tlk_dir.unwrap_or(root)));
    let resolver = Arc::new(StringResolver::new(
        tlk_fetcher,
        config.string_tables.standard.clone(),
        config.string_tables.custom.clone(),
    ));
    let loader = Arc::new(TableLoader::with_resolver(
        Arc::new(DirectoryFetcher::new(root)),
        resolver.clone(),
        config,
    ));

    let mut tasks = JoinSet::new();
    for table in scan_result.tables {
        let loader = loader.clone();
        let output = output.to_path_buf();
        tasks.spawn(async move {
            let result = match loader.load(&table.resource).await {
                Ok(data) => export_csv(&data, &table.name, &output).map(|path| (data, path)),
                Err(e) => Err(e),
            };
            (table.name, result)
        });
    }

    let (exported, errors) = collect_exports(tasks).await;
    for (name, path, rows) in &exported {
        println!("  {} -> {} ({} rows)", name, path.display(), rows);
    }

    if resolver.status() == ResolverStatus::ReadyWithFallback {
        println!("\nWarning: string tables unavailable, references were left numeric");
    }

    println!();
    println!("Export complete:");
    println!("  {} files written to {}", exported.len(), output.display());

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (name, err) in &errors {
            println!("  {}: {}", name, err);
        }
    }

    Ok(())
}

type ExportOutcome = (String, da_core::Result<(TableData, PathBuf)>);

/// Drain the export tasks into written files `(name, path, rows)` and
/// `(name, error)` pairs. A task that panicked or was cancelled is reported
/// as an error under a placeholder name.
async fn collect_exports(
    mut tasks: JoinSet<ExportOutcome>,
) -> (Vec<(String, PathBuf, usize)>, Vec<(String, String)>) {
    let mut exported = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                errors.push(("<export task>".to_string(), e.to_string()));
                continue;
            }
        };
        match result {
            Ok((data, path)) => exported.push((name, path, data.row_count())),
            Err(e) => errors.push((name, e.to_string())),
        }
    }
    (exported, errors)
}
