//! CLI binary for pdf2md-bulk.
//!
//! A thin shim over the library crate that maps CLI flags to `BulkConfig`,
//! runs one batch and writes the archive.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_bulk::pipeline::input;
use pdf2md_bulk::{
    archive, convert_batch_with, output, BatchProgressCallback, BulkConfig, CancellationToken,
    ConversionSession, Converter, PageSeparator, PdfiumConverter, Progress, ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Live progress bar plus one log line per finished document.
/// Documents finish out of order, so start times are keyed by filename.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    batch_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            batch_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self, name: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(name))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        if let Ok(mut t) = self.batch_started.lock() {
            *t = Some(Instant::now());
        }
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} documents…"))
        ));
    }

    fn on_document_start(&self, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(name.to_string(), Instant::now());
        }
    }

    fn on_document_complete(&self, name: &str, progress: Progress, markdown_len: usize) {
        let secs = self.elapsed_secs(name);
        self.bar.println(format!(
            "  {} {:<40}  {:<12}  {}",
            green("✓"),
            name,
            dim(&format!("{markdown_len:>7} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.set_position(progress.completed as u64);
    }

    fn on_document_error(&self, name: &str, progress: Progress, error: &str) {
        let secs = self.elapsed_secs(name);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.set_position(progress.completed as u64);
    }

    fn on_batch_complete(&self, progress: Progress, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = progress.completed.saturating_sub(succeeded);
        let marker = if !progress.is_complete() || (failed > 0 && succeeded > 0) {
            cyan("⚠")
        } else if failed > 0 {
            red("✘")
        } else {
            green("✔")
        };
        let elapsed = self
            .batch_started
            .lock()
            .ok()
            .and_then(|t| *t)
            .map(|t| t.elapsed())
            .unwrap_or_default();
        eprintln!("{} {}", marker, bold(&summary_line(progress, succeeded, elapsed)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in a folder into converted_markdown_files.zip
  pdf2md-bulk ./papers/

  # Several files, custom archive name, 8 workers
  pdf2md-bulk -c 8 a.pdf b.pdf c.pdf -o notes.zip

  # Also write the individual .md files
  pdf2md-bulk ./papers/ --out-dir ./markdown

  # Mix files and URLs, give up after five minutes
  pdf2md-bulk report.pdf https://arxiv.org/pdf/1706.03762 --timeout 300

  # Machine-readable per-document report
  pdf2md-bulk --json ./papers/ > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Path to libpdfium (file or directory)
  PDF2MD_BULK_CONCURRENCY  Default for --concurrency
  RUST_LOG                 Override the log filter (e.g. pdf2md_bulk=debug)
"#;

/// Convert many PDFs to Markdown and bundle them into one ZIP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-bulk",
    version,
    about = "Convert many PDF files to Markdown and bundle the results into one ZIP",
    long_about = "Convert a batch of PDF documents (local files, directories or URLs) to \
Markdown using the PDF text layer. Documents are converted concurrently; a document that \
fails does not stop the others. Successful conversions are packaged into a single ZIP archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files, directories containing PDFs, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Path of the ZIP archive to write.
    #[arg(short, long, env = "PDF2MD_BULK_OUTPUT", default_value = archive::DEFAULT_ARCHIVE_NAME)]
    output: PathBuf,

    /// Also write each Markdown file into this directory.
    #[arg(long, env = "PDF2MD_BULK_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Documents converted at the same time (1–8).
    #[arg(short, long, env = "PDF2MD_BULK_CONCURRENCY", default_value_t = 4,
          value_parser = clap::value_parser!(u8).range(1..=8))]
    concurrency: u8,

    /// Stop the batch after this many seconds; finished documents are kept.
    #[arg(long, env = "PDF2MD_BULK_TIMEOUT")]
    timeout: Option<u64>,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "PDF2MD_BULK_SEPARATOR", default_value = "none")]
    separator: String,

    /// Prepend YAML front-matter with document metadata.
    #[arg(long, env = "PDF2MD_BULK_METADATA")]
    metadata: bool,

    /// PDF user password, tried on every document.
    #[arg(long, env = "PDF2MD_BULK_PASSWORD")]
    password: Option<String>,

    /// Reject inputs larger than this many MiB.
    #[arg(long, env = "PDF2MD_BULK_MAX_FILE_SIZE_MB", default_value_t = 200)]
    max_file_size_mb: u64,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2MD_BULK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON session report to stdout.
    #[arg(long, env = "PDF2MD_BULK_JSON")]
    json: bool,

    /// Print the first N characters of each converted document.
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_BULK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_BULK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_BULK_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Resolve inputs ───────────────────────────────────────────────────
    let paths = input::expand_directories(&cli.inputs).context("Failed to read input directory")?;
    if paths.is_empty() {
        anyhow::bail!("No PDF files found in the given inputs");
    }
    let documents = input::resolve_inputs(&paths, &config)
        .await
        .context("Failed to load input documents")?;

    if !cli.quiet {
        eprintln!("{}", bold(&format!("Selected {} file(s):", documents.len())));
        for doc in &documents {
            eprintln!("  {}  {}", doc.name(), dim(&format_mb(doc.size())));
        }
    }

    let converter = PdfiumConverter::new(&config);
    converter
        .ensure_ready()
        .await
        .context("PDFium is not available; set PDFIUM_LIB_PATH or --pdfium-lib")?;

    // ── Run batch ────────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", cyan("Interrupted, stopping after finished documents…"));
            ctrl_c.cancel();
        }
    });

    let converter: Arc<dyn Converter> = Arc::new(converter);
    let started = Instant::now();
    let session = convert_batch_with(documents, converter, &config, cancel)
        .await
        .context("Batch conversion failed")?;

    // The progress bar prints its own summary.
    if !cli.quiet && !show_progress {
        eprintln!(
            "{}",
            summary_line(session.progress(), session.succeeded(), started.elapsed())
        );
    }

    write_outputs(&cli, &session).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&session.report())
            .context("Failed to serialise report")?;
        println!("{json}");
    }

    if let Some(n) = cli.preview {
        print_previews(&session, n);
    }

    if session.total() > 0 && session.succeeded() == 0 {
        anyhow::bail!("No document could be converted");
    }
    Ok(())
}

/// Write the archive (and optionally the loose Markdown files).
///
/// A cancelled batch still writes whatever finished, so the archive is
/// built from the successes directly instead of through `archive::package`.
async fn write_outputs(cli: &Cli, session: &ConversionSession) -> Result<()> {
    if session.succeeded() == 0 {
        if !cli.quiet {
            eprintln!("{}", dim("Nothing to package."));
        }
        return Ok(());
    }

    let bundle = if session.is_complete() {
        archive::package(session)
    } else {
        archive::build_archive(&session.successes())
    }
    .context("Failed to build archive")?;

    output::write_archive(&bundle, &cli.output)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if let Some(ref dir) = cli.out_dir {
        output::write_markdown_files(session, dir)
            .await
            .with_context(|| format!("Failed to write Markdown files to {}", dir.display()))?;
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} files  →  {}",
            green("✔"),
            bundle.len(),
            bold(&cli.output.display().to_string()),
        );
        if session.is_cancelled() {
            eprintln!(
                "   {}",
                dim(&format!("batch stopped early at {}", session.progress()))
            );
        }
    }
    Ok(())
}

/// `Completed in 3.2s: 3 successful, 1 failed`, noting an early stop.
fn summary_line(progress: Progress, succeeded: usize, elapsed: Duration) -> String {
    let failed = progress.completed.saturating_sub(succeeded);
    let mut line = format!(
        "Completed in {:.1}s: {} successful, {} failed",
        elapsed.as_secs_f64(),
        succeeded,
        failed
    );
    if !progress.is_complete() {
        line.push_str(&format!(" (stopped at {})", progress));
    }
    line
}

fn format_mb(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn print_previews(session: &ConversionSession, max_chars: usize) {
    for (name, outcome) in session.outcomes() {
        let Some(preview) = outcome.preview(max_chars) else {
            continue;
        };
        println!("{}", bold(&format!("── {name} ──")));
        println!("{}", preview.text);
        if preview.is_truncated() {
            println!(
                "{}",
                dim(&format!("… ({} of {} characters shown)", max_chars, preview.total_chars))
            );
        }
        println!();
    }
}

/// Map CLI args to `BulkConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BulkConfig> {
    let mut builder = BulkConfig::builder()
        .concurrency(cli.concurrency as usize)
        .max_file_size_mb(cli.max_file_size_mb)
        .page_separator(parse_separator(&cli.separator))
        .include_metadata(cli.metadata)
        .download_timeout_secs(cli.download_timeout);

    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
