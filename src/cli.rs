//! CLI argument definitions, exit codes and console helpers

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::CliOverrides;
use crate::progress::OutputMode;

/// Prompt shown when no target is given on the command line
pub const TARGET_PROMPT: &str =
    "Enter the novel URL (e.g. https://thisaccessories.com/reading-base/?cat=201) or just the ID: ";

// ============================================================
// Exit codes
// ============================================================

/// Process exit codes
///
/// A rejected id or too few slices is reported and still ends normally;
/// only faults and a forced abort are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run finished, with or without a PDF
    Success = 0,
    /// Network, filesystem, config or image failure
    GeneralError = 1,
    /// Second interrupt while shutting down
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric process exit code
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // 130 fits in u8; every variant is in 0..=255
        std::process::ExitCode::from(code.code() as u8)
    }
}

// ============================================================
// Arguments
// ============================================================

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Download a sliced web novel and rebuild it as a PDF
#[derive(Debug, Parser)]
#[command(name = "slicebook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Novel URL containing `cat=<id>`, or the bare category id
    pub target: Option<String>,

    /// Config file (default: ./slicebook.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for slice folders and the output PDF
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Site origin to fetch from
    #[arg(long)]
    pub base_url: Option<String>,

    /// Give up on a page after this many retries (default: retry forever)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Skip downloading; build the PDF from slices already on disk
    #[arg(long)]
    pub skip_fetch: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress console output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Console verbosity derived from `-v` / `-q`
    pub fn output_mode(&self) -> OutputMode {
        if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::from_verbosity(self.verbose)
        }
    }

    /// Config values given on the command line
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.base_url.clone(),
            output_dir: self.output_dir.clone(),
            max_retries: self.max_retries,
        }
    }

    /// Default tracing filter for the chosen verbosity
    ///
    /// Console progress covers normal output, so diagnostics start at `warn`.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "slicebook=error";
        }
        match self.verbose {
            0 => "slicebook=warn",
            1 => "slicebook=info",
            2 => "slicebook=debug",
            _ => "slicebook=trace",
        }
    }
}

/// Initialize tracing; `RUST_LOG` overrides the verbosity flags
pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ============================================================
// Progress bars
// ============================================================

/// Progress bar for page stitching
pub fn create_page_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("PDF Processing [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
