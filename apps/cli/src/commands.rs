//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use dossier_core::{ContextInputs, ProgressReporter, ResearchEngine, ResearchReport};
use dossier_shared::{
    AppConfig, CohortContext, RelationshipContext, ResearchConfig, ResearchRequest,
    config_file_path, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Dossier — gather everything public about a company into one research document.
#[derive(Parser)]
#[command(
    name = "dossier",
    version,
    about = "Crawl, search, and probe directories for a company, then assemble one context document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.dossier/dossier.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research a company and print the assembled context document.
    Research(ResearchArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct ResearchArgs {
    /// Company name.
    pub company: String,

    /// Company website (bare domain or URL).
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Provenance tag, e.g. a cohort code like W24.
    #[arg(short, long)]
    pub provenance: Option<String>,

    /// JSON file with relationship history from forwarded emails.
    #[arg(long)]
    pub relationship: Option<PathBuf>,

    /// JSON file with cohort founders and posts.
    #[arg(long)]
    pub cohort: Option<PathBuf>,

    /// Print the full research bundle as JSON instead of the context document.
    #[arg(long)]
    pub json: bool,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Per-request timeout in seconds (overrides config).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum pages crawled from the company domain (overrides config).
    #[arg(long)]
    pub max_pages: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dossier=info",
        1 => "dossier=debug",
        _ => "dossier=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research(args) => cmd_research(cli.config.as_deref(), args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

/// Load the config file, falling back to defaults when none exists yet.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return Ok(load_config_from(path)?);
    }
    Ok(load_config()?)
}

async fn cmd_research(config_path: Option<&Path>, args: ResearchArgs) -> Result<()> {
    let app_config = resolve_config(config_path)?;
    let mut config = ResearchConfig::from(&app_config);
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(max_pages) = args.max_pages {
        config.limits.max_domain_pages = max_pages;
    }

    let mut request = ResearchRequest::new(&args.company);
    if request.company.is_empty() {
        return Err(eyre!("company name must not be empty"));
    }
    if let Some(domain) = &args.domain {
        request = request.with_domain(domain);
    }
    if let Some(provenance) = &args.provenance {
        request = request.with_provenance(provenance);
    }

    let inputs = ContextInputs {
        relationship: read_json::<RelationshipContext>(args.relationship.as_deref())?,
        cohort: read_json::<CohortContext>(args.cohort.as_deref())?,
    };

    info!(
        company = %request.company,
        domain = request.domain().unwrap_or("-"),
        search = config.search.api_key.is_some(),
        "researching company"
    );

    let engine = ResearchEngine::new(config)?;
    let reporter = CliProgress::new();
    let report = engine.research(&request, &inputs, &reporter).await;

    let output = if args.json {
        serde_json::to_string_pretty(&serde_json::json!({
            "bundle": report.bundle,
            "context": report.context,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        }))?
    } else {
        report.context.clone()
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, &output)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            print_summary(&report, path);
        }
        None => println!("{output}"),
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: Option<&Path>) -> Result<Option<T>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid JSON in {}", path.display()))?;
    Ok(Some(value))
}

fn print_summary(report: &ResearchReport, path: &Path) {
    let bundle = &report.bundle;
    eprintln!();
    eprintln!("  Research complete for {}", bundle.request.company);
    eprintln!("  Domain pages:    {}", bundle.domain_pages.len());
    eprintln!("  Search results:  {}", bundle.search_results.len());
    eprintln!("  External pages:  {}", bundle.external_content.len());
    eprintln!(
        "  Directories:     {}",
        usize::from(bundle.directory_record.is_some())
            + usize::from(bundle.cohort_directory_record.is_some())
    );
    eprintln!("  Errors:          {}", bundle.errors.len());
    eprintln!("  Output:          {}", path.display());
    eprintln!("  Time:            {:.1}s", report.elapsed.as_secs_f64());
    eprintln!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage_complete(&self, name: &str, items: usize) {
        self.spinner.println(format!("  {name}: {items}"));
    }

    fn done(&self, _report: &ResearchReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        println!("Config already exists at: {}", path.display());
        return Ok(());
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
