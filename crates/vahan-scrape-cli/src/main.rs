//! vahan-scrape entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use vahan_scrape_cli::commands::{self, DEFAULT_CATALOG, DEFAULT_OUTPUT};
use vahan_scrape_cli::config::load_config;

#[derive(Parser)]
#[command(
    name = "vahan-scrape",
    about = "Replays Vahan dashboard postbacks to collect monthly EV registration counts",
    version
)]
struct Cli {
    /// Path to a TOML config file (else VAHAN_CONFIG, else ./vahan.toml).
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every catalog entry from the start year to last month.
    Scrape {
        /// Region / sub-region catalog CSV.
        #[arg(long, default_value = DEFAULT_CATALOG)]
        catalog: PathBuf,

        /// Output CSV.
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// First year to fetch (overrides the config file).
        #[arg(long)]
        start_year: Option<i32>,

        /// Only these region codes (repeatable).
        #[arg(long = "region", value_name = "CODE")]
        regions: Vec<String>,

        /// Append to the output instead of truncating it.
        #[arg(long)]
        append: bool,

        /// Stop at the first malformed table instead of skipping the unit.
        #[arg(long)]
        fail_fast: bool,
    },

    /// Crawl the dashboard's dropdowns into a catalog CSV.
    Catalog {
        /// Output CSV.
        #[arg(short, long, default_value = DEFAULT_CATALOG)]
        output: PathBuf,

        /// Year selected while crawling (defaults to the start year).
        #[arg(long)]
        year: Option<i32>,
    },

    /// List the units a scrape would run, without sending requests.
    Plan {
        /// Region / sub-region catalog CSV.
        #[arg(long, default_value = DEFAULT_CATALOG)]
        catalog: PathBuf,

        /// First year to fetch (overrides the config file).
        #[arg(long)]
        start_year: Option<i32>,

        /// Only these region codes (repeatable).
        #[arg(long = "region", value_name = "CODE")]
        regions: Vec<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   vahan-scrape completions bash > ~/.local/share/bash-completion/completions/vahan-scrape
    ///   vahan-scrape completions zsh > ~/.zfunc/_vahan-scrape
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Scrape {
            catalog,
            output,
            start_year,
            regions,
            append,
            fail_fast,
        } => {
            let config = commands::apply_overrides(load_config(cli.config.as_deref())?, start_year, fail_fast)?;
            let units = commands::plan(&config, &catalog, &regions, today)?;
            let summary = commands::scrape(config, &units, &output, append).await?;
            print!("{}", commands::render_summary(&summary));
        }

        Commands::Catalog { output, year } => {
            let config = load_config(cli.config.as_deref())?;
            let year = year.unwrap_or(config.start_year);
            let count = commands::crawl_catalog(&config, &output, year).await?;
            println!("Wrote {count} entries to {}", output.display());
        }

        Commands::Plan {
            catalog,
            start_year,
            regions,
            json,
        } => {
            let config = commands::apply_overrides(load_config(cli.config.as_deref())?, start_year, false)?;
            let units = commands::plan(&config, &catalog, &regions, today)?;
            print!("{}", commands::render_plan(&units, json)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vahan-scrape", &mut std::io::stdout());
        }
    }

    Ok(())
}
