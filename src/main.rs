use std::path::PathBuf;

use clap::{Parser, Subcommand};
use report_consolidator::log::init_logging;
use report_consolidator::pipeline::{self, RunOutput};
use report_consolidator::{ReportError, Result};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;
    match cli.command {
        Command::Run(args) => execute_run(args),
        Command::Check(args) => execute_check(args),
    }
}

fn execute_run(args: RunArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(ReportError::MissingInput(args.config));
    }
    let (output, paths) = pipeline::run_config(&args.config, &args.output)?;
    print_outcome(&output);
    println!("workbook: {}", paths.workbook.display());
    println!("json:     {}", paths.json.display());
    Ok(())
}

fn execute_check(args: CheckArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(ReportError::MissingInput(args.config));
    }
    let output = pipeline::check_config(&args.config)?;
    print_outcome(&output);
    Ok(())
}

fn print_outcome(output: &RunOutput) {
    for warning in &output.warnings {
        println!("warning: {warning}");
    }

    let summary = output.report.summary();
    println!(
        "{} records, {} periods, {} categories",
        summary.totals.records, summary.periods, summary.categories
    );
    println!("revenue: {:.2}", summary.totals.revenue);
    println!("cost:    {:.2}", summary.totals.cost);
    println!("profit:  {:.2}", summary.totals.profit);
    match summary.totals.average_productivity {
        Some(value) => println!("average productivity: {:.4}", value),
        None => println!("average productivity: undefined"),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate tabular business reports and derive financial indicators."
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consolidate the configured sources and export the report.
    Run(RunArgs),
    /// Read and validate the configured sources without writing any output.
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// YAML run configuration listing the sources in ingestion order.
    #[arg(long)]
    config: PathBuf,

    /// Directory that receives report.xlsx and report.json.
    #[arg(long, default_value = "report_output")]
    output: PathBuf,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// YAML run configuration listing the sources in ingestion order.
    #[arg(long)]
    config: PathBuf,
}
