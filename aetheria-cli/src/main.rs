//! Aetheria CLI - transfer-encode, transform and restyle images from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (missing prompt, invalid width)
  65  Data error (undecodable image, malformed data URI)
  66  Input file not found or unreadable
  69  Image model unavailable or failed
  74  I/O error (cannot write output)";

#[derive(Parser)]
#[command(name = "aetheria")]
#[command(author, version, about = "Image enhancement and stylistic variations", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an image file as a data URI
    Encode {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the data URI to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Write a black-and-white copy of an image (local, no model call)
    Desaturate {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (defaults to <FILE stem>.bw.png)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Scale an image down to a maximum width (local, no model call)
    Resize {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Maximum width in pixels
        #[arg(short = 'w', long, default_value_t = 1024)]
        max_width: u32,

        /// Output path (defaults to <FILE stem>.resized.png)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Enhance an image with the hosted model
    Enhance {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (defaults to <FILE stem>.enhanced.<ext>)
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Use the mock model instead of the hosted one (for testing)
        #[arg(long)]
        mock: bool,
    },

    /// Generate stylistic variations of an image with the hosted model
    Stylize {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Free-text style description
        #[arg(short, long)]
        prompt: String,

        /// Number of variations to request
        #[arg(short = 'n', long, default_value_t = aetheria_core::VARIATION_COUNT)]
        count: usize,

        /// Directory for the outputs (defaults to the input's directory)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Use the mock model instead of the hosted one (for testing)
        #[arg(long)]
        mock: bool,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "aetheria=debug,aetheria_core=debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Encode { file, out } => commands::encode::execute(file, out, quiet),
        Commands::Desaturate { file, out } => commands::local::desaturate(file, out, quiet),
        Commands::Resize {
            file,
            max_width,
            out,
        } => commands::local::resize(file, max_width, out, quiet),
        Commands::Enhance { file, out, mock } => {
            commands::enhance::execute(file, out, mock, quiet).await
        }
        Commands::Stylize {
            file,
            prompt,
            count,
            out_dir,
            mock,
        } => commands::stylize::execute(file, prompt, count, out_dir, mock, quiet).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = &exit.message {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
        process::exit(exit.code);
    }
}
