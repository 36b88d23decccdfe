//! CLI host for the shiba live preview engine.
//!
//! Watches a markdown document or a directory of documents and re-renders
//! on every change, printing lint diagnostics as they arrive.
//!
//! # Usage
//!
//! ```bash
//! shiba [OPTIONS] <COMMAND>
//!
//! # Live preview into a file a browser can reload
//! shiba watch notes/ --output /tmp/preview.html
//!
//! # One-shot conversion
//! shiba render README.md > README.html
//!
//! # Lint a document as JSON
//! shiba lint README.md --format json
//!
//! # Show the effective configuration
//! shiba config
//! ```
//!
//! While watching, every line typed on stdin is taken as a new target path.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use shiba_core::{Category, Config, ConfigStore, classify_path, emoji};
use shiba_lint::{LintResult, Linter};
use shiba_watcher::{GfmRenderer, MarkdownRenderer, PreviewSink, RenderPayload, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Live preview for markdown and HTML documents.
#[derive(Parser)]
#[command(name = "shiba", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Configuration file.
    ///
    /// Defaults to `shiba/config.yml` in the platform config directory.
    #[arg(short, long, global = true, env = "SHIBA_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch a file or directory and render on every change.
    Watch {
        /// File or directory to watch.
        #[arg(default_value = ".")]
        path: Utf8PathBuf,

        /// Write each rendered markdown document to this file.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Render one document to stdout.
    Render {
        /// Document to render.
        file: Utf8PathBuf,
    },

    /// Lint one markdown document.
    Lint {
        /// Document to lint.
        file: Utf8PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = LintFormat::Text)]
        format: LintFormat,
    },

    /// Print the effective configuration.
    Config,
}

/// Lint output format.
#[derive(Clone, Copy, ValueEnum)]
enum LintFormat {
    /// One line per diagnostic.
    Text,
    /// The full result as JSON.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose` and
/// `info` by default, with notify held at `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn config_store(cli: &Cli) -> ConfigStore {
    cli.config
        .clone()
        .map_or_else(ConfigStore::user_default, ConfigStore::new)
}

// =============================================================================
// DISPLAY SINK
// =============================================================================

/// Shows previews on the terminal, or writes them to a file.
struct DisplaySink {
    output: Option<Utf8PathBuf>,
    title: String,
}

impl DisplaySink {
    fn new(output: Option<Utf8PathBuf>, title: impl Into<String>) -> Self {
        Self {
            output,
            title: title.into(),
        }
    }

    fn write_document(&self, path: &Utf8Path, body: &str) -> std::io::Result<()> {
        std::fs::write(path, html_document(&self.title, body))
    }
}

impl PreviewSink for DisplaySink {
    fn render(&self, payload: RenderPayload) {
        match (&payload, &self.output) {
            (RenderPayload::Markdown(html), Some(output)) => {
                match self.write_document(output, html) {
                    Ok(()) => info!(path = %output, bytes = html.len(), "Preview updated"),
                    Err(error) => warn!(path = %output, error = %error, "Failed to write preview"),
                }
            }
            (RenderPayload::Markdown(html), None) => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "rendered markdown ({} bytes)", html.len());
            }
            (RenderPayload::Html(path), _) => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "html document changed: {path}");
            }
        }
    }

    fn lint_result(&self, _file_name: &str, result: LintResult) {
        let mut out = std::io::stdout().lock();
        for line in format_diagnostics(&result) {
            let _ = writeln!(out, "{line}");
        }
    }

    fn add_recent_document(&self, path: &Utf8Path) {
        debug!(path = %path, "Recent document");
    }
}

/// Escapes text for use in HTML content or a quoted attribute.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Wraps a rendered fragment in a standalone page.
fn html_document(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

/// One line per diagnostic plus a summary line.
fn format_diagnostics(result: &LintResult) -> Vec<String> {
    let mut lines: Vec<String> = result
        .diagnostics
        .iter()
        .map(|d| {
            format!(
                "{}:{}:{}: {} {} [{}]",
                result.file_name, d.line, d.column, d.severity, d.message, d.rule_id
            )
        })
        .collect();
    lines.push(if result.is_clean() {
        format!("{}: no problems", result.file_name)
    } else {
        format!("{}: {} problem(s)", result.file_name, result.diagnostics.len())
    });
    lines
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches `path` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configured lint backend cannot be resolved.
async fn run_watch(
    store: &ConfigStore,
    path: Utf8PathBuf,
    output: Option<Utf8PathBuf>,
) -> color_eyre::Result<()> {
    let config = store.load();
    let sink = Arc::new(DisplaySink::new(output, path.as_str()));
    let mut watcher = Watcher::from_config(&path, config, sink)
        .wrap_err("Cannot watch without a usable lint backend")?;

    if let Some(url) = watcher.lint_rule_url() {
        info!(url, "Lint rules");
    }
    watcher.start(path).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let target = line.trim();
                    if !target.is_empty() {
                        watcher.change_watching_dir(target).await;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, no more target changes");
                    stdin_open = false;
                }
                Err(error) => {
                    warn!(error = %error, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    watcher.stop().await;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(error) => {
                warn!(error = %error, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Renders one document to stdout.
///
/// HTML documents are printed as they are.
fn run_render(config: &Config, file: &Utf8Path) -> color_eyre::Result<()> {
    let text = std::fs::read_to_string(file).wrap_err_with(|| format!("Failed to read {file}"))?;

    let html = match classify_path(file, config) {
        Some(Category::Html) => text,
        Some(Category::Markdown) | None => {
            let html = GfmRenderer.to_html(&text);
            emoji::replace_all(&html).into_owned()
        }
    };

    let mut out = std::io::stdout().lock();
    write!(out, "{html}")?;
    Ok(())
}

/// Lints one document with the configured backend.
async fn run_lint(config: &Config, file: &Utf8Path, format: LintFormat) -> color_eyre::Result<()> {
    let linter =
        Linter::from_config(config)?.ok_or_else(|| eyre!("Linting is disabled in the configuration"))?;

    let text = tokio::fs::read_to_string(file)
        .await
        .wrap_err_with(|| format!("Failed to read {file}"))?;
    let file_name = file.file_name().unwrap_or(file.as_str());
    let result = linter.try_lint(file_name, &text).await?;

    let mut out = std::io::stdout().lock();
    match format {
        LintFormat::Text => {
            for line in format_diagnostics(&result) {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "rules: {}", linter.lint_rule_url())?;
        }
        LintFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?;
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}

/// Prints the merged configuration as YAML.
fn run_config(store: &ConfigStore) -> color_eyre::Result<()> {
    let config = store.load();
    let yaml = config.to_yaml_string()?;

    let mut out = std::io::stdout().lock();
    match store.path() {
        Some(path) => writeln!(out, "# {path}")?,
        None => writeln!(out, "# no configuration directory, built-in defaults")?,
    }
    write!(out, "{yaml}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Config is loaded once and shared from here on
    let store = config_store(&cli);

    match cli.command {
        Commands::Watch { path, output } => run_watch(&store, path, output).await,
        Commands::Render { file } => run_render(&store.load(), &file),
        Commands::Lint { file, format } => run_lint(&store.load(), &file, format).await,
        Commands::Config => run_config(&store),
    }
}
