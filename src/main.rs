use std::path::PathBuf;

use clap::Parser;
use reglamento_articles::{
    emit_files, extract_articles, load_config, read_source, run_meta, ArticleRecord, OutputFormat, RunConfig,
    SourceError, DEFAULT_CONFIG,
};
use tracing_subscriber::EnvFilter;

/// Extract article records from the full-text dump of a Reglamento.
#[derive(Parser)]
#[command(name = "reglamento2json")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Run config (YAML). Defaults to ./reglamento.yaml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source text file, overrides `source` from the config
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Records file to write, overrides `output.path`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format, overrides `output.format`
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip the .meta.json sidecar
    #[arg(long)]
    no_meta: bool,

    /// Print the first 10 and last 5 records after extraction
    #[arg(long)]
    preview: bool,
}

fn event(value: serde_json::Value) {
    eprintln!("{}", value);
}

fn print_preview(records: &[ArticleRecord]) {
    let short = |s: &str| s.chars().take(60).collect::<String>();
    for r in records.iter().take(10) {
        println!("  Art. {:>8} (orden {:>3}) - {}", r.number, r.sequence_index, short(&r.title));
    }
    if records.len() > 15 {
        println!("...");
    }
    for r in records.iter().skip(10.max(records.len().saturating_sub(5))) {
        println!("  Art. {:>8} (orden {:>3}) - {}", r.number, r.sequence_index, short(&r.title));
    }
}

fn main() {
    // WARN by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 1) Config: explicit path must exist, the default one is optional
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut cfg = if cli.config.is_some() || config_path.exists() {
        match load_config(&config_path) {
            Ok(c) => c,
            Err(e) => {
                event(serde_json::json!({
                    "tool": "load_config",
                    "file": config_path,
                    "error": e.to_string(),
                    "error_code": 3
                }));
                std::process::exit(3);
            }
        }
    } else {
        RunConfig::default()
    };
    if let Some(input) = &cli.input {
        cfg.source = input.display().to_string();
    }
    if let Some(output) = &cli.output {
        cfg.output.path = output.display().to_string();
    }
    if let Some(format) = cli.format {
        cfg.output.format = format;
    }
    if cli.no_meta {
        cfg.output.meta = false;
    }
    if let Err(e) = cfg.validate() {
        event(serde_json::json!({"tool": "load_config", "error": e.to_string(), "error_code": 3}));
        std::process::exit(3);
    }
    event(serde_json::json!({
        "tool": "load_config",
        "status": "ok",
        "id": cfg.id,
        "source": cfg.source,
        "output": cfg.output.path,
        "format": cfg.output.format
    }));

    // 2) Source text
    let source = match read_source(&PathBuf::from(&cfg.source)) {
        Ok(s) => s,
        Err(err) => {
            let label = match err {
                SourceError::FileNotFound(_) => "FileNotFound",
                SourceError::Read(_) => "ReadFailed",
            };
            event(serde_json::json!({
                "tool": "read_source",
                "file": cfg.source,
                "error": label,
                "detail": err.to_string(),
                "error_code": 1
            }));
            std::process::exit(1);
        }
    };
    event(serde_json::json!({
        "tool": "read_source",
        "file": cfg.source,
        "chars": source.text.chars().count(),
        "sha256": source.sha256
    }));

    // 3) Pipeline
    let output = extract_articles(&source.text, &cfg.extract);
    event(serde_json::json!({
        "tool": "extract_articles",
        "front_matter_skipped_bytes": output.stats.front_matter_skipped_bytes,
        "article_headings": output.stats.articles.headings,
        "duplicates_skipped": output.stats.articles.duplicates_skipped,
        "short_skipped": output.stats.articles.short_skipped,
        "malformed_numbers": output.stats.articles.malformed_numbers,
        "transitorio_headings": output.stats.transitorios.headings,
        "unparseable_transitorios": output.stats.transitorios.unparseable,
        "articles": output.stats.numbered_records,
        "transitorios": output.stats.transitorio_records
    }));
    if cli.preview {
        print_preview(&output.records);
    }

    // 4) Emit records (+ meta sidecar)
    let meta = cfg.output.meta.then(|| run_meta(&cfg, &source, &output));
    let records_path = PathBuf::from(&cfg.output.path);
    match emit_files(&output.records, cfg.output.format, meta.as_ref(), &records_path) {
        Ok(paths) => {
            event(serde_json::json!({
                "tool": "emit_files",
                "records_path": paths.records_path,
                "meta_path": paths.meta_path,
                "records": output.records.len()
            }));
        }
        Err(e) => {
            event(serde_json::json!({
                "tool": "emit_files",
                "file": cfg.output.path,
                "error": e.to_string(),
                "error_code": 6
            }));
            std::process::exit(6);
        }
    }
}
