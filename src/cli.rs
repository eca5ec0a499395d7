//! Command-line interface for the harvester.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::config::{
    parse_date, sanitize_identifier, HarvestConfig, DEFAULT_OUTPUT_DIR, DEFAULT_OVERVIEW_PATH,
};
use crate::error::Result;
use crate::harvester::harvest_endpoint;
use crate::http::create_client;
use crate::overview::{decide, HarvestDecision, Overview};

/// OAI Harvester - enumerate and retrieve metadata records from OAI-PMH endpoints.
#[derive(Parser)]
#[command(name = "oai-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest every endpoint listed in a configuration file.
    Harvest {
        /// Endpoint configuration file (YAML)
        config: PathBuf,

        /// Harvest overview store
        #[arg(short = 's', long, default_value = DEFAULT_OVERVIEW_PATH)]
        overview: PathBuf,

        /// Directory harvested records are written to
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Harvest records changed on or after this date (YYYY-MM-DD),
        /// overriding the overview's per-endpoint decision
        #[arg(short, long)]
        from: Option<String>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            config,
            overview,
            output,
            from,
        } => harvest_command(&config, &overview, &output, from.as_deref()),
    }
}

/// Execute the harvest command.
///
/// The overview is opened once, consulted per endpoint, and written back
/// exactly once at the end, whether the run succeeded or not.
fn harvest_command(
    config_path: &Path,
    overview_path: &Path,
    output_dir: &Path,
    from: Option<&str>,
) -> Result<()> {
    let from_override = from.map(parse_date).transpose()?;
    let config = HarvestConfig::from_yaml(&fs::read_to_string(config_path)?)?;
    fs::create_dir_all(output_dir)?;

    let client = create_client()?;
    let mut overview = Overview::open(overview_path)?;

    let run_result = harvest_all(&client, &config, &mut overview, output_dir, from_override);
    let close_result = overview.close();

    run_result?;
    close_result
}

fn harvest_all(
    client: &Client,
    config: &HarvestConfig,
    overview: &mut Overview,
    output_dir: &Path,
    from_override: Option<NaiveDate>,
) -> Result<()> {
    let mode = overview.mode();
    println!(
        "{} {} endpoint(s) in {} mode",
        style("Harvesting").bold(),
        config.endpoints.len(),
        style(mode.as_str()).cyan()
    );

    let mut failures = 0;
    for endpoint in &config.endpoints {
        let decision = decide(mode, overview.endpoint_state(&endpoint.uri));
        // an explicit --from overrides everything except a blocked endpoint
        let from = match decision {
            HarvestDecision::Skip => {
                println!("  {} {}", style("skipped").yellow(), endpoint.uri);
                continue;
            }
            _ if from_override.is_some() => from_override,
            HarvestDecision::Full => None,
            HarvestDecision::Incremental { from } => Some(from),
        };

        let pb = ProgressBar::new_spinner();
        #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("valid template"),
        );
        pb.set_message(format!("Harvesting {}...", endpoint.uri));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        let result = harvest_endpoint(client, endpoint, from, &mut |record| {
            let name = format!("{}.xml", sanitize_identifier(&record.identifier));
            fs::write(output_dir.join(name), &record.raw_xml)?;
            Ok(())
        });
        pb.finish_and_clear();

        // the attempt is stamped even when the harvest failed
        overview
            .endpoint_state(&endpoint.uri)
            .record_attempt(result.is_ok());

        match result {
            Ok(count) => {
                let kind = if from.is_some() { "incremental" } else { "full" };
                println!(
                    "  {} {} ({kind}, {} record(s))",
                    style("harvested").green(),
                    endpoint.uri,
                    style(count).bold()
                );
            }
            Err(e) => {
                failures += 1;
                tracing::error!(endpoint = %endpoint.uri, error = %e, "Harvest failed");
                println!("  {} {} ({e})", style("failed").red().bold(), endpoint.uri);
            }
        }
    }

    if failures > 0 {
        println!(
            "{} {failures} endpoint(s) failed; their attempts were recorded for retry",
            style("Warning:").yellow().bold()
        );
    }
    Ok(())
}
