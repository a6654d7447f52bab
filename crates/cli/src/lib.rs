pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oohquote_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "oohquote",
    about = "Out-of-home quoting operator CLI",
    long_about = "Operate the quoting engine: migrations, config inspection, ad-hoc pricing, and a scripted demo flow.",
    after_help = "Examples:\n  oohquote migrate\n  oohquote config\n  oohquote price --rate-card rates.toml --format 48-sheet --periods 10,11,12\n  oohquote demo"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Price one media-format booking against a rate card file")]
    Price {
        #[arg(long, help = "Path to a TOML rate card")]
        rate_card: PathBuf,
        #[arg(long, help = "Media format id, e.g. 48-sheet")]
        format: String,
        #[arg(long, default_value_t = 1, help = "Number of panels booked")]
        quantity: u32,
        #[arg(
            long,
            value_delimiter = ',',
            required = true,
            help = "Incharge period numbers, comma separated"
        )]
        periods: Vec<u32>,
        #[arg(long, value_delimiter = ',', help = "Location ids, comma separated")]
        locations: Vec<String>,
        #[arg(long, default_value_t = 0, help = "Creative assets to design")]
        creative_assets: u32,
        #[arg(long, help = "Format category for creative tier matching")]
        category: Option<String>,
    },
    #[command(about = "Run a scripted in-memory quote flow and print the resulting quote")]
    Demo,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Price {
            rate_card,
            format,
            quantity,
            periods,
            locations,
            creative_assets,
            category,
        } => commands::price::run(commands::price::PriceRequest {
            rate_card,
            format,
            quantity,
            periods,
            locations,
            creative_assets,
            category,
        }),
        Command::Demo => commands::demo::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging() {
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // A second init (e.g. under tests) keeps the first subscriber.
    let outcome = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    let _ = outcome;
}
