use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use climate_narrative::config::{expand_tilde, Config, ConfigOverrides};
use climate_narrative::metrics::raw::RawClimateRecord;
use climate_narrative::output::csv::{deltas_to_csv, evidence_to_csv};
use climate_narrative::output::json::{render_json, render_stamped_json};
use climate_narrative::output::table::{
    render_batch_table, render_deltas_table, render_evidence_table, render_report_table,
    render_thresholds_table,
};
use climate_narrative::output::tagged::render_tagged;
use climate_narrative::pipeline::{generate_batch, BatchOutcome, NarrativeEngine};
use climate_narrative::report::{Analysis, NarrativeReport};
use climate_narrative::server::run_server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Tagged,
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(
    name = "climate-narrative",
    about = "Deterministic climate-impact narratives from current vs projected climate snapshots"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long = "max-key-changes")]
    max_key_changes: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone)]
struct InputArgs {
    /// Climate record JSON; `-` reads stdin.
    #[arg(required_unless_present = "sample")]
    input: Option<PathBuf>,
    /// Use the built-in sample record instead of a file.
    #[arg(long, conflicts_with = "input")]
    sample: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Tagged)]
        format: ReportFormat,
    },
    Deltas {
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    Evidence {
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    Thresholds {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(|p| p.to_str().map(expand_tilde).unwrap_or_else(|| p.to_path_buf()))
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    config.apply_overrides(ConfigOverrides {
        max_key_changes: cli.max_key_changes,
        host,
        port,
    })?;

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if matches!(cli.command, Commands::Serve { .. }) {
        let bind = config.bind_address();
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let engine = NarrativeEngine::from_config(&config);
    match &cli.command {
        Commands::Report { input, format } => {
            let record = load_input(input)?;
            let report = engine.generate(&record)?;
            print_report(&report, *format)?;
        }
        Commands::Deltas { input, format } => {
            let record = load_input(input)?;
            let (_, analysis) = engine.analyze(&record)?;
            print_deltas(&analysis, *format)?;
        }
        Commands::Evidence { input, format } => {
            let record = load_input(input)?;
            let (_, analysis) = engine.analyze(&record)?;
            print_evidence(&analysis, *format)?;
        }
        Commands::Batch { inputs, format } => {
            let mut records = Vec::with_capacity(inputs.len());
            for path in inputs {
                records.push((path.display().to_string(), RawClimateRecord::load(path)?));
            }
            info!(records = records.len(), "starting batch");
            let outcomes = generate_batch(Arc::new(engine), records).await?;
            print_batch(&outcomes, *format)?;
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            if failed > 0 {
                return Err(anyhow!("{failed} of {} records failed", outcomes.len()));
            }
        }
        Commands::Thresholds { format } => match format {
            OutputFormat::Table => println!("{}", render_thresholds_table(engine.thresholds())),
            OutputFormat::Json => println!("{}", render_json(engine.thresholds())?),
            OutputFormat::Csv => {
                warn!("CSV output for thresholds not implemented, using JSON");
                println!("{}", render_json(engine.thresholds())?);
            }
        },
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_input(args: &InputArgs) -> Result<RawClimateRecord> {
    if args.sample {
        return Ok(RawClimateRecord::sample());
    }
    let path = args
        .input
        .as_ref()
        .ok_or_else(|| anyhow!("an input file or --sample is required"))?;
    if path.as_os_str() == "-" {
        let mut data = String::new();
        std::io::stdin()
            .read_to_string(&mut data)
            .context("failed reading climate record from stdin")?;
        return RawClimateRecord::from_json(&data);
    }
    RawClimateRecord::load(path)
}

fn print_report(report: &NarrativeReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Tagged => print!("{}", render_tagged(report)),
        ReportFormat::Json => println!("{}", render_json(report)?),
        ReportFormat::Table => println!("{}", render_report_table(report)),
    }
    Ok(())
}

fn print_deltas(analysis: &Analysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_deltas_table(analysis)),
        OutputFormat::Json => println!("{}", render_json(analysis)?),
        OutputFormat::Csv => print!("{}", deltas_to_csv(analysis)?),
    }
    Ok(())
}

fn print_evidence(analysis: &Analysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_evidence_table(&analysis.evidence)),
        OutputFormat::Json => println!("{}", render_json(&analysis.evidence)?),
        OutputFormat::Csv => print!("{}", evidence_to_csv(&analysis.evidence)?),
    }
    Ok(())
}

fn print_batch(outcomes: &[BatchOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_batch_table(outcomes)),
        OutputFormat::Json => println!("{}", render_stamped_json(outcomes)?),
        OutputFormat::Csv => {
            warn!("CSV output for batch not implemented, using JSON");
            println!("{}", render_stamped_json(outcomes)?);
        }
    }
    Ok(())
}
