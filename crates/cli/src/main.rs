use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::{Args, Parser, Subcommand};
use paperdex_cache::{Fingerprint, FingerprintKind, HistoryStore, MetaValue, Metadata};
use std::path::PathBuf;
use walkdir::WalkDir;

const DEFAULT_PROMPT: &str = "phd_analysis";

#[derive(Parser)]
#[command(name = "paperdex")]
#[command(about = "Manage the paper-analysis history cache", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Storage directory (overrides PAPERDEX_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List analysis history, most recent first
    List(ListArgs),

    /// Print a cached analysis for a source
    Show(ShowArgs),

    /// Store an externally produced analysis file in the cache
    Import(ImportArgs),

    /// Remove a history entry by cache key
    Delete(DeleteArgs),

    /// Report which PDFs under a directory already have a cached analysis
    Scan(ScanArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Number of records to show
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
struct ShowArgs {
    /// URL or file path of the analyzed source
    source: String,

    /// Treat the source as a local file (fingerprint its content)
    #[arg(long)]
    file: bool,

    /// Prompt template name
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,
}

#[derive(Args)]
struct ImportArgs {
    /// URL or file path the analysis was produced from
    source: String,

    /// Markdown file holding the analysis text
    analysis: PathBuf,

    /// Treat the source as a local file (fingerprint its content)
    #[arg(long)]
    file: bool,

    /// Prompt template name
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Metadata as key=value (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,
}

#[derive(Args)]
struct DeleteArgs {
    /// Cache key, as shown by `list`
    cache_key: String,

    /// Also delete the backing analysis file
    #[arg(long)]
    purge: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to walk for PDF inputs
    directory: PathBuf,

    /// Prompt template name
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let store = HistoryStore::open(resolve_data_dir(cli.data_dir))?;

    match cli.command {
        Commands::List(args) => run_list(&store, &args),
        Commands::Show(args) => run_show(&store, &args),
        Commands::Import(args) => run_import(&store, &args),
        Commands::Delete(args) => run_delete(&store, &args),
        Commands::Scan(args) => run_scan(&store, &args),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(raw) = std::env::var("PAPERDEX_DATA_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".paperdex").join("analyses"),
        None => PathBuf::from("saved_analyses"),
    }
}

fn run_list(store: &HistoryStore, args: &ListArgs) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        println!("No history found.");
        return Ok(());
    }

    println!(
        "\nFound {} records. Showing last {}:\n",
        records.len(),
        records.len().min(args.limit)
    );
    println!("{:<20} {:<15} {:<40} CACHE KEY", "DATE", "PROMPT", "SOURCE");
    println!("{}", "-".repeat(100));

    for record in records.iter().take(args.limit) {
        println!(
            "{:<20} {:<15} {:<40} {}",
            format_timestamp(record.entry.timestamp),
            record.entry.prompt_name,
            elide(source_display(&record.entry.original_source), 38),
            record.cache_key,
        );
    }
    Ok(())
}

fn run_show(store: &HistoryStore, args: &ShowArgs) -> Result<()> {
    match store.get(&args.source, args.file, &args.prompt)? {
        Some(hit) => {
            print!("{}", hit.content);
            Ok(())
        }
        None => bail!(
            "no cached analysis for {} (prompt: {})",
            args.source,
            args.prompt
        ),
    }
}

fn run_import(store: &HistoryStore, args: &ImportArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.analysis)
        .with_context(|| format!("read analysis file {}", args.analysis.display()))?;

    let mut metadata = Metadata::new();
    for pair in &args.meta {
        let (key, value) = parse_meta(pair)?;
        metadata.insert(key, value);
    }

    let fingerprint = Fingerprint::compute(&args.source, args.file);
    if fingerprint.kind() == FingerprintKind::ReadFallback {
        log::warn!("source file was unreadable; cached under its path string instead of its content");
    }

    let location = store.save(&args.source, &fingerprint, &args.prompt, &content, metadata)?;
    println!("saved: {}", location.display());
    Ok(())
}

fn run_delete(store: &HistoryStore, args: &DeleteArgs) -> Result<()> {
    store.delete(&args.cache_key, args.purge)?;
    println!("deleted: {}", args.cache_key);
    Ok(())
}

/// The batch driver's skip-if-present check: walk a directory of PDFs and
/// report which already carry a cached analysis for the given template.
fn run_scan(store: &HistoryStore, args: &ScanArgs) -> Result<()> {
    if !args.directory.is_dir() {
        bail!("directory not found: {}", args.directory.display());
    }

    let mut cached = 0usize;
    let mut pending = 0usize;
    for entry in WalkDir::new(&args.directory)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !is_pdf(entry.path()) {
            continue;
        }
        let Some(path) = entry.path().to_str() else {
            log::warn!("skipping non-UTF-8 path: {}", entry.path().display());
            continue;
        };
        if store.get(path, true, &args.prompt)?.is_some() {
            cached += 1;
            println!("cached   {path}");
        } else {
            pending += 1;
            println!("pending  {path}");
        }
    }

    println!("\n{cached} cached, {pending} pending (prompt: {})", args.prompt);
    Ok(())
}

fn is_pdf(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn format_timestamp(unix_secs: f64) -> String {
    Local
        .timestamp_opt(unix_secs as i64, 0)
        .single()
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn source_display(source: &str) -> &str {
    // Local paths collapse to their file name; URLs are shown whole.
    if source.starts_with("http://") || source.starts_with("https://") {
        source
    } else {
        source.rsplit(['/', '\\']).next().unwrap_or(source)
    }
}

fn elide(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn parse_meta(pair: &str) -> Result<(String, MetaValue)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("invalid --meta {pair:?}, expected KEY=VALUE");
    };
    if key.is_empty() {
        bail!("invalid --meta {pair:?}, empty key");
    }
    let value = if let Ok(b) = raw.parse::<bool>() {
        MetaValue::Bool(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        MetaValue::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        MetaValue::Float(f)
    } else {
        MetaValue::Text(raw.to_string())
    };
    Ok((key.to_string(), value))
}
