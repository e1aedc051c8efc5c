// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use log::{info, warn};

use tcxview::{AnalysisOptions, TcxFile, TraceSession, DEFAULT_EXPORT_FILE};

#[derive(Parser)]
#[command(
    name = "tcxview",
    about = "Analyze a running activity recorded as TCX",
    long_about = "Parse a single-lap running TCX trace, derive speed, pace and heart rate series, \
                  export them as semicolon CSV and print the values at chosen instants"
)]
struct Args {
    /// TCX file to analyze
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Window size for the speed average (overrides the options file)
    #[arg(long, short = 'w')]
    window_size: Option<usize>,

    /// JSON options file with one window configuration per metric
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// CSV export target
    #[arg(long, short = 'o', default_value = DEFAULT_EXPORT_FILE)]
    output: PathBuf,

    /// RFC 3339 instant to read the visible series at; may be repeated
    #[arg(long = "at")]
    at: Vec<String>,

    /// Print cursor readouts as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_options(args: &Args) -> Result<AnalysisOptions> {
    let mut options = match &args.config {
        Some(path) => AnalysisOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => AnalysisOptions::default(),
    };
    if let Some(window_size) = args.window_size {
        options.speed.window_size = window_size;
    }
    Ok(options)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = load_options(&args)?;
    let mut session = TraceSession::new(TcxFile::new(&args.file), options)
        .context("invalid window configuration")?;

    let stats = *session
        .load()
        .with_context(|| format!("analyzing {}", args.file.display()))?;
    println!(
        "Parsing {} points from file took {}ms ({}ms in XML).",
        stats.record_count,
        stats.load_time.as_millis(),
        stats.xml_time.unwrap_or_default().as_millis()
    );

    session
        .export_csv(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("wrote {}", args.output.display());

    for at in &args.at {
        let instant = DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("invalid --at instant {at:?}"))?;
        let x = instant.timestamp_millis() as f64;
        match session.read_cursor(x, None)? {
            Some(readout) if args.json => println!("{}", serde_json::to_string(&readout)?),
            Some(readout) => println!("{}", readout.status_line()),
            None => warn!("{at} lies outside the plotted range"),
        }
    }
    Ok(())
}
