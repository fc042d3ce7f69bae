use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use inkcal_core::{RuleSet, apply, match_info_in_rows};
use inkcal_ingest::assemble;
use inkcal_ingest::time::{local_date, parse_timezone};
use inkcal_rules::{HttpFetcher, LoadedRules, RuleStore};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod sources;
mod state;

use config::Config;
use sources::{SourcePaths, load_sources};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("INKCAL_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "inkcal",
    version = VERSION,
    about = "Event mapping and display data for the e-ink family calendar"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.inkcal/config.toml
    Init,

    /// Inspect and test the event mapping rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Merge source files into the display bundle JSON
    Build(BuildArgs),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Load the active rules and print where they came from
    Show {
        /// Skip the cache and re-fetch the published table
        #[arg(long)]
        refresh: bool,

        /// Rule table URL instead of the configured one
        #[arg(long)]
        url: Option<String>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and parse the published table without touching the cache
    Fetch {
        #[arg(long)]
        url: Option<String>,

        /// Strict lookup of this text against the fetched rows
        #[arg(long = "match")]
        match_text: Option<String>,
    },

    /// Run an event summary through the mapping rules
    Map { text: String },

    /// First rule whose declared match type matches the text
    Match { text: String },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Calendar items (Google Calendar `items` shape)
    #[arg(long)]
    calendar: Option<PathBuf>,

    /// Waste collection schedule
    #[arg(long)]
    waste: Option<PathBuf>,

    /// Waste fraction id -> name table
    #[arg(long)]
    fractions: Option<PathBuf>,

    /// Public holiday items (same shape as --calendar)
    #[arg(long)]
    holidays: Option<PathBuf>,

    /// Pre-built event records
    #[arg(long)]
    events: Option<PathBuf>,

    /// Daily forecast list, or forecast object with daily/hourly_today/meta
    #[arg(long)]
    weather: Option<PathBuf>,

    /// Hourly forecast list (overrides hourly data inside --weather)
    #[arg(long)]
    hourly: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip the rule cache and re-fetch the published table
    #[arg(long)]
    refresh: bool,

    /// Days to show (overrides config)
    #[arg(long)]
    days: Option<u32>,

    /// Leave public holidays out
    #[arg(long)]
    no_holidays: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            config::init_config()?;
        }

        Command::Rules { command } => {
            let cfg = config::load_config()?;
            let store = rule_store(&cfg)?;
            match command {
                RulesCommand::Show { refresh, url, json } => {
                    let loaded = store.load(refresh, url.as_deref()).await;
                    print_rules(&loaded, json)?;
                }
                RulesCommand::Fetch { url, match_text } => {
                    let rows = store
                        .fetch_rows(url.as_deref())
                        .await
                        .context("fetching rule table")?;
                    match match_text {
                        Some(text) => {
                            let info = match_info_in_rows(&rows, &text);
                            println!("{}", serde_json::to_string_pretty(&info)?);
                        }
                        None => {
                            let rules = RuleSet::from_rows(rows);
                            println!("Parsed {} rules", rules.len());
                            print_rows(&rules);
                        }
                    }
                }
                RulesCommand::Map { text } => {
                    let loaded = store.load(false, None).await;
                    let mapped = apply(&text, &loaded.rules);
                    println!("{}", serde_json::to_string_pretty(&mapped)?);
                }
                RulesCommand::Match { text } => {
                    let loaded = store.load(false, None).await;
                    let info = loaded.rules.match_info(&text);
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
            }
        }

        Command::Build(args) => build(args).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn rule_store(cfg: &Config) -> Result<RuleStore<HttpFetcher>> {
    RuleStore::with_http(cfg.store_config()?, cfg.fetch_timeout()).context("building HTTP client")
}

async fn build(args: BuildArgs) -> Result<()> {
    let mut cfg = config::load_config()?;
    if let Some(days) = args.days {
        cfg.display.days = days;
    }
    if args.no_holidays {
        cfg.display.include_holidays = false;
    }

    let tz = parse_timezone(&cfg.display.timezone)?;
    let today = local_date(Utc::now(), tz);
    let opts = cfg.pipeline_options(today);

    let mut store = rule_store(&cfg)?;
    let loaded = store.reload(args.refresh, None).await;
    tracing::info!(origin = %loaded.origin, count = loaded.rules.len(), "rules ready");

    let data = load_sources(&SourcePaths {
        calendar: args.calendar,
        holidays: args.holidays,
        waste: args.waste,
        fractions: args.fractions,
        events: args.events,
        weather: args.weather,
        hourly: args.hourly,
    });
    let bundle = assemble(&data, &store.active().rules, &opts);
    let json = serde_json::to_string_pretty(&bundle)?;

    match args.out {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {} events to {}", bundle.events.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_rules(loaded: &LoadedRules, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(loaded)?);
        return Ok(());
    }
    println!(
        "Source: {} | loaded {} | {} rules\n",
        loaded.origin,
        loaded.loaded_at.to_rfc3339(),
        loaded.rules.len()
    );
    print_rows(&loaded.rules);
    Ok(())
}

fn print_rows(rules: &RuleSet) {
    for row in rules.to_rows() {
        let col = |v: &Option<String>| v.clone().unwrap_or_default();
        println!(
            "{:<14} {:<12} {:<10} icon={:<12} repl={:<10} color={:<8} size={}",
            col(&row.keyword),
            col(&row.mode),
            col(&row.match_type),
            col(&row.icon),
            col(&row.replacement),
            col(&row.color),
            col(&row.size_px),
        );
    }
}
