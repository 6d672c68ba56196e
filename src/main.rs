//! treeinfo CLI - scan ROOT TTree sources and export branch tables

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use treeinfo::config::{self, TreeinfoConfig};
use treeinfo::report::{self, UrlTemplate};
use treeinfo::scanner::{ScanEvent, ScannerRegistry, TTreeScanner};
use treeinfo::sources::{self, SourcePath};
use treeinfo::storage::TreeStore;
use treeinfo::ui::{self, Icons, Spinner};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "treeinfo")]
#[command(version)]
#[command(about = "Extract ROOT TTree branch definitions from C++ sources")]
#[command(long_about = r#"
treeinfo scans C++ sources that build ROOT TTrees and records every branch,
where it is declared, and which lines comment on or assign its value variable.

Example usage:
  treeinfo scan --files TTree-making-files.txt
  treeinfo scan Selection/
  treeinfo csv --output treeinfo.csv
  treeinfo html --url-template "https://github.com/org/repo/blob/main/{file}#L{line}"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Suppress status output (errors are still printed)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter treeinfo.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Scan sources into a fresh database
    Scan {
        /// Files or directories to scan
        paths: Vec<PathBuf>,

        /// File listing one source path per line
        #[arg(short, long)]
        files: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Export the database as CSV
    Csv {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the database as an HTML table
    Html {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source link template with {file} and {line} placeholders
        #[arg(short, long)]
        url_template: Option<String>,
    },

    /// Show row counts of the database
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        treeinfo::output::init_quiet(cli.quiet);
        let path = cli.config.unwrap_or_else(config::default_config_path);
        config::write_config(&path, &TreeinfoConfig::starter(), force)?;
        ui::success(&format!("Wrote {}", path.display()));
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    treeinfo::output::init_quiet(cli.quiet || cfg.quiet());
    let database = |flag: Option<PathBuf>| flag.unwrap_or_else(|| cfg.database_path());

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Scan { paths, files, database: db } => {
            let db = database(db);
            run_scan(&cfg, &db, &paths, files.as_deref())?;
        }

        Commands::Csv { database: db, output } => {
            let db = database(db);
            let output = output
                .or_else(|| cfg.csv.as_deref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("treeinfo.csv"));
            config::check_distinct_output(&db, &output)?;

            let store = open_existing(&db)?;
            let rows = report::write_csv_file(&store, &output)?;
            ui::success(&format!("Wrote {} rows to {}", rows, output.display()));
        }

        Commands::Html { database: db, output, url_template } => {
            let db = database(db);
            let output = output
                .or_else(|| cfg.html.as_deref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("treeinfo.html"));
            config::check_distinct_output(&db, &output)?;

            let template = match url_template.or_else(|| cfg.url_template.clone()) {
                Some(t) => UrlTemplate::new(t)?,
                None => UrlTemplate::default(),
            };
            ui::status(Icons::LINK, "Links", template.as_str());

            let store = open_existing(&db)?;
            let rows = report::write_html_file(&store, &template, &output)?;
            ui::success(&format!("Wrote {} rows to {}", rows, output.display()));
        }

        Commands::Stats { database: db, format } => {
            let db = database(db);
            let store = open_existing(&db)?;
            let stats = store.stats()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!("treeinfo statistics ({})", db.display()));
                println!("{}", ui::stats_table(stats.rows().as_slice()));
                if stats.orphans > 0 {
                    ui::warn(&format!("{} rows have dangling references", stats.orphans));
                }
            }
        }
    }

    Ok(())
}

fn open_existing(db: &Path) -> anyhow::Result<TreeStore> {
    if !db.exists() {
        anyhow::bail!("database {} not found (run `treeinfo scan` first)", db.display());
    }
    TreeStore::open(db).with_context(|| format!("opening {}", db.display()))
}

fn collect_sources(
    registry: &ScannerRegistry,
    cfg: &TreeinfoConfig,
    paths: &[PathBuf],
    list: Option<&Path>,
) -> anyhow::Result<Vec<SourcePath>> {
    let mut all = Vec::new();
    if let Some(list) = list {
        all.extend(sources::read_file_list(list)?);
    }
    let excludes = cfg.excludes();
    for path in paths {
        let found = sources::walk(path, &excludes, |p| registry.find_scanner(p).is_some())
            .with_context(|| format!("walking {}", path.display()))?;
        all.extend(found);
    }
    Ok(all)
}

fn run_scan(cfg: &TreeinfoConfig, db: &Path, paths: &[PathBuf], list: Option<&Path>) -> anyhow::Result<()> {
    if paths.is_empty() && list.is_none() {
        anyhow::bail!("nothing to scan: pass source paths or --files <list>");
    }

    let mut registry = ScannerRegistry::new();
    registry.register(Box::new(TTreeScanner::with_extensions(cfg.extensions())));

    let sources = collect_sources(&registry, cfg, paths, list)?;
    ui::header("Scanning ROOT TTree sources");
    ui::status(Icons::FILE, "Files", &sources.len().to_string());
    ui::status(Icons::DATABASE, "Database", &db.display().to_string());

    config::ensure_db_dir(db)?;
    let mut store = TreeStore::create(db).with_context(|| format!("creating {}", db.display()))?;

    let started = Instant::now();
    let spinner = Spinner::new("Scanning");
    let events = registry.scan(sources).inspect(|event| {
        if let Ok(ScanEvent::FileSeen { filename }) = event {
            spinner.set_message(&format!("Scanning {}", filename));
        }
    });

    let stats = match treeinfo::loader::load(&mut store, events) {
        Ok(stats) => stats,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("scan aborted, database left empty");
        }
    };
    spinner.finish_with_summary(started.elapsed(), stats.files, stats.trees, stats.branches);

    ui::section("Summary");
    ui::summary_row("Comments:", &stats.comments.to_string());
    ui::summary_row("Assignments:", &stats.assigns.to_string());
    if stats.duplicate_trees > 0 {
        ui::warn(&format!(
            "{} tree names were declared more than once; see log for locations",
            stats.duplicate_trees
        ));
    }

    let orphans = store.orphan_count()?;
    if orphans > 0 {
        anyhow::bail!("{} rows have dangling references", orphans);
    }
    ui::success(&format!("Database saved to {}", db.display()));
    Ok(())
}
