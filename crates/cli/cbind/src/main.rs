//! cbind command-line interface
//!
//! Reads C headers and reports their declarations, diagnostics and
//! duplicates, or generates Rust FFI bindings for them.

use anyhow::Result;
use cb_driver::Overrides;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod check;
mod compiler;
mod duplicates;
mod generate;
mod parse;

#[derive(Parser)]
#[command(name = "cbind")]
#[command(about = "C header to Rust FFI binding translator", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the declarations in headers
    Parse {
        /// Header files
        #[arg(required = true)]
        headers: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check headers for errors
    Check {
        /// Header files
        #[arg(required = true)]
        headers: Vec<PathBuf>,
    },

    /// Report repeated declarations
    Duplicates {
        /// Header files
        #[arg(required = true)]
        headers: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Treat declarations differing only in `const` as duplicates
        #[arg(long)]
        ignore_qualifiers: bool,
    },

    /// Generate Rust bindings
    Generate {
        /// Header files; taken from the config file when omitted
        headers: Vec<PathBuf>,

        /// Config file (defaults to ./cbind.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Library to link against
        #[arg(long)]
        link: Option<String>,

        /// Only emit items matching this name or `prefix*` pattern
        #[arg(long)]
        allowlist: Vec<String>,

        /// Path holding the C scalar types
        #[arg(long)]
        ctypes_prefix: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse { headers, format } => {
            parse::list_declarations(&headers, format)?;
        }
        Commands::Check { headers } => {
            check::check(&headers)?;
        }
        Commands::Duplicates {
            headers,
            format,
            ignore_qualifiers,
        } => {
            duplicates::report_duplicates(&headers, format, ignore_qualifiers)?;
        }
        Commands::Generate {
            headers,
            config,
            output,
            link,
            allowlist,
            ctypes_prefix,
        } => {
            generate::generate(
                config.as_deref(),
                Overrides {
                    headers,
                    output,
                    link,
                    allowlist,
                    ctypes_prefix,
                },
            )?;
        }
    }

    Ok(())
}
