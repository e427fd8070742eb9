use super::report::print_summary;
use clap::Args;
use console::style;
use lungnodule_lib::extract::{run_batch, DecodeErrorPolicy, Extractor, SizeScope};
use lungnodule_lib::index::scan_directory;
use lungnodule_lib::report::{summarize, write_results, OutputFormat};
use lungnodule_lib::util::{format_duration, progress::create_progress_bar};
use lungnodule_lib::{Algorithm, Config, LogSink, NoduleError, Result, SearchMethod, Settings};
use log::LevelFilter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    #[arg(help = "Directory of text reports", required_unless_present = "input_dir")]
    pub input: Option<PathBuf>,

    #[arg(long, short = 'i', conflicts_with = "input", help = "Directory of text reports")]
    pub input_dir: Option<PathBuf>,

    #[arg(long, short = 'o', help = "Output file (default: stdout)")]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "csv", help = "Output format (csv, json)")]
    pub format: String,

    #[arg(long, short = 'a', help = "Algorithm (danforth, fleischner)")]
    pub algorithm: Option<String>,

    #[arg(long, help = "Custom rule table; replaces the algorithm's table")]
    pub rules: Option<PathBuf>,

    #[arg(long, help = "Phrase search method (string, tokens)")]
    pub psm: Option<String>,

    #[arg(long, help = "Phrase search method for rule 6 (default: --psm)")]
    pub r6psm: Option<String>,

    #[arg(
        long = "size",
        visible_alias = "get-largest-nodule-size",
        help = "Report the largest nodule size in mm"
    )]
    pub get_largest_nodule_size: bool,

    #[arg(long, help = "Sentences scanned for sizes (document, matched)")]
    pub size_scope: Option<String>,

    #[arg(long, help = "Input encoding label (default: utf-8)")]
    pub codec: Option<String>,

    #[arg(
        long,
        visible_alias = "use-base-sentence-splitter",
        help = "Use the heuristic sentence splitter"
    )]
    pub base_splitter: bool,

    #[arg(long, help = "Trained sentence splitter parameters (TOML)")]
    pub splitter_model: Option<PathBuf>,

    #[arg(long, help = "Undecodable files: report or skip")]
    pub on_decode_error: Option<String>,

    #[arg(long, short = 'j', help = "Worker threads")]
    pub jobs: Option<usize>,

    #[arg(long, short = 'r', help = "Descend into subdirectories")]
    pub recursive: bool,

    #[arg(long, help = "Only files matching this glob (repeatable)")]
    pub include: Vec<String>,

    #[arg(long, help = "Print a per-decision summary to stderr")]
    pub summary: bool,
}

impl ClassifyArgs {
    /// The input directory, given positionally or with `--input-dir`.
    pub fn input(&self) -> Result<&Path> {
        self.input
            .as_deref()
            .or(self.input_dir.as_deref())
            .ok_or_else(|| NoduleError::Config("No input directory given".to_string()))
    }

    /// Settings named on the command line. Unset flags stay `None`.
    pub fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            algorithm: self.algorithm.as_deref().map(str::parse::<Algorithm>).transpose()?,
            psm: self.psm.as_deref().map(str::parse::<SearchMethod>).transpose()?,
            r6psm: self.r6psm.as_deref().map(str::parse::<SearchMethod>).transpose()?,
            get_largest_nodule_size: self.get_largest_nodule_size.then_some(true),
            codec: self.codec.clone(),
            use_base_sentence_splitter: self.base_splitter.then_some(true),
            size_scope: self.size_scope.as_deref().map(str::parse::<SizeScope>).transpose()?,
            on_decode_error: self
                .on_decode_error
                .as_deref()
                .map(str::parse::<DecodeErrorPolicy>)
                .transpose()?,
            jobs: self.jobs,
            recursive: self.recursive.then_some(true),
            include: (!self.include.is_empty()).then(|| self.include.clone()),
            rules: self.rules.clone(),
            splitter_model: self.splitter_model.clone(),
            log_dir: None,
            log_level: None,
        })
    }
}

pub fn handle_classify_command(
    args: ClassifyArgs,
    config: Config,
    global: Settings,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let format: OutputFormat = args.format.parse()?;
    let input = args.input()?;
    let settings = config.settings.overlay(global).overlay(args.settings()?);

    let level = if verbose {
        LevelFilter::Debug
    } else {
        settings.log_level()?
    };
    let log_path = super::init_logging(&settings.log_dir(), level)?;
    let sink = LogSink::new(level);

    let options = settings.extract_options();
    let extractor = Extractor::new(&options)?;

    log::info!(
        "Run started: input={} algorithm={} rules={} psm={} r6psm={} size={} codec={} splitter={}",
        input.display(),
        options.algorithm,
        extractor.rules().name,
        options.search.psm,
        options.search.rule6_method(),
        options.extract_size,
        extractor.encoding().name(),
        extractor.splitter().name()
    );
    if let Some(path) = &config.config_path {
        log::info!("Config file: {}", path.display());
    }

    let (files, stats) = scan_directory(input, &settings.scan_options(), &sink)?;
    log::info!(
        "Found {} files ({} hidden skipped, {} filtered out)",
        stats.files_found,
        stats.hidden_skipped,
        stats.filtered_out
    );

    if !quiet {
        eprintln!(
            "{} Classifying {} reports with {}...",
            style(">>>").cyan(),
            style(files.len()).bold(),
            style(&extractor.rules().name).bold()
        );
    }

    let pb = create_progress_bar(files.len() as u64, "Classifying", quiet || verbose);
    let started = Instant::now();
    let results = run_batch(&extractor, &files, &settings.batch_options(), &sink, Some(&pb))?;
    pb.finish_and_clear();

    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_results(&mut out, &results, format)?;
            out.flush()?;
            if !quiet {
                eprintln!("{} Results written to {}", style("✓").green(), path.display());
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_results(&mut out, &results, format)?;
            out.flush()?;
        }
    }

    let summary = summarize(&results);
    log::info!(
        "Run finished in {}: {} rows, {} failed",
        format_duration(started.elapsed()),
        summary.total,
        summary.failed
    );

    if !quiet {
        if summary.failed > 0 {
            eprintln!(
                "{} {} files could not be processed",
                style("!").yellow(),
                style(summary.failed).yellow()
            );
        }
        if args.summary {
            print_summary(&summary);
        }
        if let Some(path) = log_path {
            eprintln!("{} Log written to {}", style(">>>").cyan(), path.display());
        }
    }

    Ok(())
}
