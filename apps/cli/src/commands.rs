//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use aptsheet_core::pipeline::{ExportSummary, ProgressReporter, export_to_path};
use aptsheet_shared::{
    AppConfig, AptSheetError, RunConfig, init_config, load_config, load_config_from,
    load_listings,
};
use aptsheet_sheet::{ColumnTable, Schema, column_letters};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// aptsheet: compare apartment floorplans in a spreadsheet.
#[derive(Parser)]
#[command(
    name = "aptsheet",
    version,
    about = "Turn scraped apartment listings into a CSV/TSV comparison sheet.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Export listings to a CSV/TSV sheet.
    Export {
        /// JSON file holding an array of listings.
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to `<output.file_name>.<format>` in the working directory).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        options: ColumnOptions,
    },

    /// Print the columns the current options would produce.
    Columns {
        #[command(flatten)]
        options: ColumnOptions,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show {
        /// Config file to show instead of `~/.aptsheet/aptsheet.toml`.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Flags that override values from the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct ColumnOptions {
    /// Config file to use instead of `~/.aptsheet/aptsheet.toml`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// One Yes/No column per included utility.
    #[arg(long)]
    separate_utilities: bool,

    /// One Yes/No column per pet type.
    #[arg(long)]
    separate_pets: bool,

    /// Price picked from a rent range: lowest, highest or average.
    #[arg(long)]
    price: Option<String>,

    /// Output format: csv or tsv.
    #[arg(long)]
    format: Option<String>,

    /// Non-numeric values in numeric columns: skip-row or default-zero.
    #[arg(long)]
    numeric_policy: Option<String>,

    /// Turn on a named boolean option (repeatable).
    #[arg(long = "flag", value_name = "NAME")]
    flags: Vec<String>,
}

impl ColumnOptions {
    /// Load the config file and resolve it with these flags on top.
    fn resolve(&self) -> Result<(AppConfig, RunConfig)> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        self.apply(&mut config);
        let run = RunConfig::try_from(&config)?;
        Ok((config, run))
    }

    fn apply(&self, config: &mut AppConfig) {
        if self.separate_utilities {
            config.columns.separate_utilities = true;
        }
        if self.separate_pets {
            config.columns.separate_pets = true;
        }
        if let Some(price) = &self.price {
            config.columns.price_selector = price.clone();
        }
        if let Some(format) = &self.format {
            config.output.format = format.clone();
        }
        if let Some(policy) = &self.numeric_policy {
            config.export.numeric_policy = policy.clone();
        }
        for flag in &self.flags {
            config.columns.flags.insert(flag.clone(), true);
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "aptsheet=info",
        1 => "aptsheet=debug",
        _ => "aptsheet=trace",
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export {
            input,
            out,
            options,
        } => cmd_export(&input, out.as_deref(), &options),
        Command::Columns { options } => cmd_columns(&options),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show { config } => cmd_config_show(config.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_export(input: &Path, out: Option<&Path>, options: &ColumnOptions) -> Result<()> {
    let (config, run) = options.resolve()?;

    let listings = load_listings(input)?;
    let out_path = match out {
        Some(p) => p.to_path_buf(),
        None => default_output_path(&config, &run)?,
    };

    info!(
        input = %input.display(),
        out = %out_path.display(),
        listings = listings.len(),
        price = %run.price_selector,
        "exporting listings"
    );

    let reporter = CliProgress::new();
    let summary = export_to_path(
        &run,
        &ColumnTable::standard(),
        &listings,
        &out_path,
        &reporter,
    )?;

    println!();
    println!("  Sheet written!");
    println!("  Path:       {}", out_path.display());
    println!("  Listings:   {}", summary.listings);
    println!("  Duplicates: {}", summary.skipped_duplicates);
    println!("  Rows:       {}", summary.rows_written);
    println!("  Skipped:    {}", summary.rows_failed);
    println!("  Columns:    {}", summary.columns);
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn default_output_path(config: &AppConfig, run: &RunConfig) -> Result<PathBuf> {
    let cwd =
        std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    Ok(cwd.join(format!(
        "{}.{}",
        config.output.file_name,
        run.output_format.extension()
    )))
}

fn cmd_columns(options: &ColumnOptions) -> Result<()> {
    let (_, run) = options.resolve()?;
    let schema = Schema::build(&ColumnTable::standard(), &run)?;

    for (position, column) in schema.columns().iter().enumerate() {
        let width = column
            .width
            .map(|w| format!("{w:>5.1}"))
            .unwrap_or_else(|| "    -".to_string());
        println!(
            "{:>3}  {:<3} {width}  {:<32} {}",
            position,
            column_letters(position),
            column.key,
            column.title
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    println!("{}", render_config(path)?);
    Ok(())
}

/// The effective configuration as TOML, defaults filled in.
fn render_config(path: Option<&Path>) -> Result<String> {
    let config: AppConfig = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(toml::to_string_pretty(&config)?)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn listing_started(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Exporting [{current}/{total}] {name}"));
    }

    fn row_failed(&self, label: &str, error: &AptSheetError) {
        self.spinner.println(format!("  skipped {label}: {error}"));
    }

    fn done(&self, _summary: &ExportSummary) {
        self.spinner.finish_and_clear();
    }
}
