pub mod classify;
pub mod report;
pub mod rules;
pub mod split;

use chrono::Local;
use clap::{Parser, Subcommand};
use lungnodule_lib::{NoduleError, Result};
use log::LevelFilter;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lungnodule")]
#[command(about = "Rule-based lung nodule classification of radiology reports", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to config file (default: $LUNGNODULE_CONFIG or XDG config)")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'L', global = true, help = "Directory for run logs, '-' for stderr")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Log level (error, warn, info, debug, trace)")]
    pub log_level: Option<String>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'q', global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Classify every report in a directory")]
    Classify(classify::ClassifyArgs),

    #[command(about = "Show a rule table")]
    Rules {
        #[arg(long, short = 'a', help = "Built-in algorithm (danforth, fleischner)")]
        algorithm: Option<String>,

        #[arg(long, help = "Custom rule table (TOML)")]
        rules: Option<PathBuf>,

        #[arg(long, help = "Print the table as TOML")]
        dump: bool,
    },

    #[command(about = "Validate a rule table")]
    CheckRules {
        #[arg(help = "Rule table (TOML)")]
        path: PathBuf,
    },

    #[command(about = "Split a document into sentences")]
    Split {
        #[arg(help = "Input file, '-' for stdin", default_value = "-")]
        input: PathBuf,

        #[arg(long, help = "Use the heuristic splitter")]
        base_splitter: bool,

        #[arg(long, help = "Trained splitter parameters (TOML)")]
        splitter_model: Option<PathBuf>,

        #[arg(long, help = "Input encoding label")]
        codec: Option<String>,

        #[arg(long, help = "Print sentences as JSON")]
        json: bool,
    },

    #[command(about = "Learn sentence splitter parameters from raw text")]
    TrainSplitter {
        #[arg(required = true, help = "Training files or directories")]
        inputs: Vec<PathBuf>,

        #[arg(long, short = 'o', help = "Where to write the parameters")]
        output: PathBuf,

        #[arg(long, help = "Input encoding label")]
        codec: Option<String>,

        #[arg(long, help = "Do not merge the built-in English parameters")]
        no_defaults: bool,
    },
}

/// Route log records to `<log_dir>/<YYYYmmddHHMMSS>.log`, or to stderr when
/// `log_dir` is `-`. Returns the log file path.
pub fn init_logging(log_dir: &Path, level: LevelFilter) -> Result<Option<PathBuf>> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    let log_path = if log_dir == Path::new("-") {
        None
    } else {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", Local::now().format("%Y%m%d%H%M%S")));
        let file = File::create(&path).map_err(|e| {
            NoduleError::Config(format!("Cannot create log file {}: {}", path.display(), e))
        })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        Some(path)
    };

    // A second init in the same process keeps the first logger.
    let _ = builder.try_init();
    Ok(log_path)
}

/// Stderr logging for the short-lived commands.
pub fn init_stderr_logging(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
