use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

mod data;
mod models;
mod readiness;
mod report;
mod risk;

/// Fixed gate value for the cosmetic login toggle. Not a credential store:
/// any matching string unlocks the session.
const GATE_PASSWORD: &str = "demo";

#[derive(Parser)]
#[command(name = "change-dashboard")]
#[command(about = "Change management readiness and maintenance risk dashboard", long_about = None)]
struct Cli {
    /// Directory holding the dashboard CSV datasets
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Enable the login gate for this invocation
    #[arg(long)]
    require_login: bool,
    /// Gate value checked when --require-login is set
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline maintenance KPIs
    Overview,
    /// Per-machine trends, model accuracy, and failure probability
    Maintenance {
        /// Machine to inspect; defaults to the first machine in the log
        #[arg(long)]
        machine: Option<String>,
        #[arg(long, default_value_t = risk::DEFAULT_SEED)]
        seed: u64,
        /// Emit the full machine risk table as JSON
        #[arg(long)]
        json: bool,
    },
    /// ADKAR readiness means and departments needing attention
    Adkar {
        /// Restrict to these departments; repeatable, empty means all
        #[arg(long = "department")]
        departments: Vec<String>,
        /// Replacement survey CSV used instead of the base table
        #[arg(long)]
        survey: Option<PathBuf>,
        /// Write the department-mean table as CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Change initiative milestone timeline
    Timeline,
    /// Executive summary across readiness and machine risk
    Summary {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write sample datasets into the data directory
    Seed,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.require_login && cli.password.as_deref() != Some(GATE_PASSWORD) {
        bail!("protected mode is enabled; supply the correct --password to proceed");
    }

    match cli.command {
        Commands::Overview => {
            let maintenance = data::load_maintenance(&data::maintenance_path(&cli.data_dir))?;
            print!("{}", report::overview(&maintenance)?);
        }
        Commands::Maintenance {
            machine,
            seed,
            json,
        } => {
            let maintenance = data::load_maintenance(&data::maintenance_path(&cli.data_dir))?;
            let machine_id = match machine {
                Some(id) => id,
                None => maintenance
                    .first()
                    .map(|record| record.machine_id.clone())
                    .context("maintenance table is empty")?,
            };
            if !maintenance.iter().any(|record| record.machine_id == machine_id) {
                bail!("no maintenance records for machine {machine_id}");
            }

            print!("{}", report::machine_trend(&maintenance, &machine_id));

            let accuracy = risk::held_out_accuracy(&maintenance, seed)?;
            println!("Model accuracy: {:.2}%", accuracy * 100.0);

            let model = risk::fit_failure_model(&maintenance)?;
            let scores = risk::score_machines(&model, &maintenance)?;
            let selected = scores
                .iter()
                .find(|score| score.machine_id == machine_id)
                .context("selected machine missing from risk table")?;
            println!(
                "Failure probability for {}: {:.2}%",
                selected.machine_id,
                selected.risk * 100.0
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&scores)?);
            }
        }
        Commands::Adkar {
            departments,
            survey,
            out,
        } => {
            let survey_rows = match survey {
                Some(path) => {
                    let rows = data::load_survey(&path)?;
                    println!("Using uploaded survey data from {}.", path.display());
                    rows
                }
                None => data::load_survey(&data::survey_path(&cli.data_dir))?,
            };

            let means = readiness::department_means(&survey_rows, &departments);
            println!("Average ADKAR scores by department:");
            print!("{}", report::readiness_table(&means));
            println!();

            let flagged = readiness::needs_attention(&means);
            if flagged.is_empty() {
                println!("All departments meet the minimum threshold.");
            } else {
                println!(
                    "Departments needing attention (score < {:.1}):",
                    readiness::ATTENTION_THRESHOLD
                );
                print!("{}", report::readiness_table(&flagged));
            }

            if let Some(path) = out {
                std::fs::write(&path, readiness::means_to_csv(&means)?)?;
                println!("ADKAR summary written to {}.", path.display());
            }
        }
        Commands::Timeline => {
            // The one guarded view: a missing or malformed milestone file is
            // a warning, not a failure.
            match data::load_milestones(&data::milestone_path(&cli.data_dir)) {
                Ok(milestones) => print!("{}", report::timeline(&milestones)),
                Err(err) => println!(
                    "Warning: {err:#}. Place a valid {} in {}.",
                    data::MILESTONE_FILE,
                    cli.data_dir.display()
                ),
            }
        }
        Commands::Summary { out } => {
            let survey_rows = data::load_survey(&data::survey_path(&cli.data_dir))?;
            let maintenance = data::load_maintenance(&data::maintenance_path(&cli.data_dir))?;
            let summary = report::build_summary(&survey_rows, &maintenance)?;
            print!("{summary}");

            if let Some(path) = out {
                std::fs::write(&path, &summary)?;
                println!("Summary written to {}.", path.display());
            }
        }
        Commands::Seed => {
            data::write_seed_data(&cli.data_dir)?;
            println!("Sample data written to {}.", cli.data_dir.display());
        }
    }

    Ok(())
}
