#![allow(non_snake_case)]
use RustedReconstruct::Utils::logger::{init_logger, save_results_to_csv};
use RustedReconstruct::Utils::plots::plot_reconstruction;
use RustedReconstruct::Utils::summary::summary_table;
use RustedReconstruct::reconstruction::errors::ReconstructionError;
use RustedReconstruct::reconstruction::pipeline::{
    FunctionReconstruction, ReconstructionInput, TaskSettings, load_task,
};
use clap::Parser;
use log::info;
use std::path::PathBuf;

/// Reconstructs f(x) from f'(x) (and optionally f''(x)) and initial conditions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// First derivative f'(x)
    #[arg(long, allow_hyphen_values = true)]
    fprime: Option<String>,
    /// Second derivative f''(x); reconstruction then starts from it
    #[arg(long, allow_hyphen_values = true)]
    fdoubleprime: Option<String>,
    /// Initial condition f(a)=b written as "a,b"
    #[arg(long, allow_hyphen_values = true)]
    ic_f: Option<String>,
    /// Initial condition f'(c)=d written as "c,d"
    #[arg(long, allow_hyphen_values = true)]
    ic_fprime: Option<String>,
    /// Known zeros of f'(x), comma separated
    #[arg(long, allow_hyphen_values = true)]
    critical: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    xmin: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    xmax: Option<f64>,
    /// Task file with the inputs; flags given on the command line override it
    #[arg(long)]
    task: Option<PathBuf>,
    /// Save the stacked plots as png
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Save the sampled curves as csv
    #[arg(long)]
    csv: Option<PathBuf>,
    /// debug, info, warn, error or off
    #[arg(long)]
    loglevel: Option<String>,
    /// Also write the log to log_<date_time>.txt
    #[arg(long)]
    log_file: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ReconstructionError> {
    let (mut input, settings) = match &cli.task {
        Some(path) => load_task(path)?,
        None => (ReconstructionInput::default(), TaskSettings::default()),
    };
    if let Some(fprime) = cli.fprime {
        input.fprime = fprime;
    }
    if let Some(fdoubleprime) = cli.fdoubleprime {
        input.fdoubleprime = fdoubleprime;
    }
    if let Some(ic_f) = cli.ic_f {
        input.ic_f = ic_f;
    }
    if let Some(ic_fprime) = cli.ic_fprime {
        input.ic_fprime = ic_fprime;
    }
    if let Some(critical) = cli.critical {
        input.critical_points = critical;
    }
    if let Some(xmin) = cli.xmin {
        input.xmin = xmin;
    }
    if let Some(xmax) = cli.xmax {
        input.xmax = xmax;
    }

    let loglevel = cli.loglevel.or(settings.loglevel).unwrap_or_else(|| "warn".to_string());
    init_logger(Some(&loglevel), cli.log_file || settings.log_to_file)
        .map_err(ReconstructionError::Config)?;

    let output = FunctionReconstruction::new(input).run()?;
    println!("{}", summary_table(&output));

    if let Some(path) = cli.plot.or(settings.plot) {
        plot_reconstruction(&output, &path).map_err(|e| {
            ReconstructionError::Config(format!("cannot plot to {}: {}", path.display(), e))
        })?;
        info!("plot saved to {}", path.display());
    }
    if let Some(path) = cli.csv.or(settings.csv) {
        save_results_to_csv(&output, &path).map_err(|e| {
            ReconstructionError::Config(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!("results saved to {}", path.display());
    }
    Ok(())
}
