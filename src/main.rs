use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use feesched::{
    compose::{self, CanonicalTables, FeeScheduleRequest},
    config::Config,
    normalize,
    selector::{self, RateType},
    store::CanonicalStore,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "feesched", about = "Normalize rate sources and generate fee schedules")]
struct Cli {
    /// YAML configuration file; defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Year used in canonical and output file names (defaults to the current year).
    #[arg(long, global = true)]
    year: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize physician, DME and injectable sources into canonical tables.
    Normalize,
    /// List the localities available for a state.
    Localities {
        #[arg(long, value_parser = selector::parse_state)]
        state: String,
    },
    /// Compose a priced fee schedule from the canonical tables.
    Compose {
        #[arg(long, value_parser = selector::parse_state)]
        state: String,
        #[arg(long, value_parser = selector::parse_locality)]
        locality: u32,
        /// physician (1) or facility (2)
        #[arg(long)]
        rate_type: RateType,
        #[arg(long, value_parser = selector::parse_percentage)]
        percentage: u32,
        #[arg(long, value_parser = selector::parse_schedule_number)]
        schedule_number: String,
    },
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load(cli.config.as_deref()).with_context(|| {
        format!("loading configuration from {:?}", cli.config.as_deref())
    })?;
    let today = Local::now();
    let year = cli.year.unwrap_or_else(|| today.year());
    let store = CanonicalStore::new(&config.data_dir, year);

    match cli.command {
        // ─── stage one: normalize ─────────────────────────────────────
        Command::Normalize => {
            let failures = normalize::run_normalization(&config, &store)
                .with_context(|| format!("normalizing into {:?}", config.data_dir))?;
            if !failures.is_empty() {
                for (path, e) in &failures {
                    error!("{} was not ingested: {}", path.display(), e);
                }
                bail!("{} physician file(s) failed ingestion", failures.len());
            }
            info!("data processing complete");
        }

        Command::Localities { state } => {
            let physician = store
                .read_physician()
                .context("reading physician canonical table; run `normalize` first")?;
            let localities = compose::localities_for_state(&physician, &state);
            if localities.is_empty() {
                bail!("no localities found for {state}");
            }
            let list: Vec<String> = localities.iter().map(|l| format!("{l:02}")).collect();
            println!("Localities for {state}: {}", list.join(", "));
        }

        // ─── stage two: compose ───────────────────────────────────────
        Command::Compose {
            state,
            locality,
            rate_type,
            percentage,
            schedule_number,
        } => {
            let tables = CanonicalTables::load(&store)
                .context("reading canonical tables; run `normalize` first")?;
            let request = FeeScheduleRequest {
                state,
                locality,
                rate_type,
                percentage,
                schedule_number,
                year,
            };
            info!(
                state = %request.state,
                locality = %format!("{:02}", request.locality),
                percentage = %format!("{}%", request.percentage),
                schedule_number = %request.schedule_number,
                rate_type = %request.rate_type,
                "fee schedule selection"
            );

            let schedule = compose::compose(&tables, &request)?;
            let path = compose::write_fee_schedule(&config.output_dir, &schedule)
                .with_context(|| format!("writing {}", schedule.file_name))?;
            info!(
                "fee schedule FS_{} generated on {} with {} rows",
                request.schedule_number,
                today.format("%m-%d-%Y"),
                schedule.rows.len()
            );
            println!("{}", path.display());
        }
    }

    Ok(())
}
