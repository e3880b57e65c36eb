mod commands;
mod config;
mod domain;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Concept DSL compiler.
#[derive(Parser)]
#[command(name = "conceptc", version, about = "Concept DSL compiler")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a conceptc.toml (default: ./conceptc.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `conceptc_core=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Treat warnings as errors
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile scripts and print the expanded concept model
    Parse {
        /// Script files, compiled together into one model
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compile scripts and report errors and warnings only
    Check {
        /// Script files, compiled together into one model
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compile scripts and generate the model outline
    Generate {
        /// Script files, compiled together into one model
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory (default: print to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging(level: Option<&str>, quiet: bool) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None if quiet => EnvFilter::new("off"),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.quiet);

    let mut config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if cli.strict {
        config.compiler.strict_warnings = true;
    }

    match cli.command {
        Commands::Parse { files } => {
            commands::parse::cmd_parse(&files, &config, cli.output, cli.quiet);
        }
        Commands::Check { files } => {
            commands::check::cmd_check(&files, &config, cli.output, cli.quiet);
        }
        Commands::Generate { files, out } => {
            commands::generate::cmd_generate(&files, out.as_deref(), &config, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
