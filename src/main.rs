use clap::{ArgAction, Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod model;
mod pipeline;
mod render;
mod table;
mod time;

use config::{
    DEFAULT_OUT_DIR, EventsConfig, ImageFormat, OutputConfig, ProtocolsConfig, ResolutionChoice,
    TimeWindow,
};
use pipeline::Outcome;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "netlog-plot")]
#[command(about = "Time-series charts from firewall and packet-capture log exports", long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct TableArgs {
    /// Field delimiter of the input table.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    #[arg(long, default_value = "Time")]
    time_column: String,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory for charts; created if missing.
    #[arg(long, env = "NETLOG_PLOT_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    #[arg(long, value_enum, env = "NETLOG_PLOT_FORMAT", default_value_t = ImageFormat::default())]
    format: ImageFormat,

    /// Also write an HTML index page next to the charts.
    #[arg(long)]
    html: bool,
}

impl From<OutputArgs> for OutputConfig {
    fn from(args: OutputArgs) -> Self {
        OutputConfig {
            dir: args.out_dir,
            format: args.format,
            html: args.html,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Chart events per second over the whole table.
    Events {
        input: PathBuf,

        #[arg(long, default_value = "Events per Second")]
        title: String,

        #[command(flatten)]
        table: TableArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Chart packets per time bin for each protocol, with mean and ±1σ band.
    Protocols {
        input: PathBuf,

        /// Bin width: s, ms, us or ps. Anything else falls back to s.
        #[arg(short, long, env = "NETLOG_PLOT_RESOLUTION", default_value = "s")]
        resolution: String,

        /// Keep packets up to this many seconds after the first one.
        #[arg(
            short = 't',
            long,
            env = "NETLOG_PLOT_MAX_TIME",
            value_parser = config::parse_time_window
        )]
        max_time: TimeWindow,

        #[arg(long, default_value = "Protocol")]
        protocol_column: String,

        #[command(flatten)]
        table: TableArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn delimiter_byte(c: char) -> Result<u8> {
    if !c.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character, got {:?}", c);
    }
    Ok(c as u8)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Commands::Events {
            input,
            title,
            table,
            output,
        } => {
            let mut cfg = EventsConfig::new(input);
            cfg.title = title;
            cfg.table.delimiter = delimiter_byte(table.delimiter)?;
            cfg.table.time_column = table.time_column;
            cfg.output = output.into();

            match pipeline::run_events(&cfg)? {
                Outcome::NoValidData => println!("No valid Time data found in the CSV."),
                Outcome::NoEventsAfterGrouping => println!(
                    "No events found after grouping by second. Please check the CSV file format."
                ),
                Outcome::Written { charts, report } => {
                    for chart in &charts {
                        println!("Graph saved to {}", chart.path.display());
                    }
                    if let Some(path) = report {
                        println!("Report saved to {}", path.display());
                    }
                }
            }
        }

        Commands::Protocols {
            input,
            resolution,
            max_time,
            protocol_column,
            table,
            output,
        } => {
            let choice = ResolutionChoice::from_token(&resolution);
            if choice.defaulted {
                println!("Invalid resolution option. Defaulting to seconds ('s').");
            }

            let mut cfg = ProtocolsConfig::new(input, choice.resolution, max_time);
            cfg.table.delimiter = delimiter_byte(table.delimiter)?;
            cfg.table.time_column = table.time_column;
            cfg.table.protocol_column = Some(protocol_column);
            cfg.output = output.into();

            match pipeline::run_protocols(&cfg)? {
                Outcome::NoValidData => {
                    println!("No valid Time/Protocol data found in the CSV.")
                }
                Outcome::NoEventsAfterGrouping => println!(
                    "No packets found after grouping by {} bin within {} sec.",
                    cfg.resolution, cfg.window
                ),
                Outcome::Written { charts, report } => {
                    for chart in &charts {
                        println!(
                            "Graph for protocol {} saved to {}",
                            chart.label.as_deref().unwrap_or_default(),
                            chart.path.display()
                        );
                    }
                    if let Some(path) = report {
                        println!("Report saved to {}", path.display());
                    }
                }
            }
        }
    }

    Ok(())
}
