mod cli;

use clap::Parser;
use log::LevelFilter;
use lungnodule_lib::{Config, Settings};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let config = Config::new(cli.config.clone())?;
    let global = Settings {
        log_dir: cli.log_dir.clone(),
        log_level: cli.log_level.clone(),
        ..Default::default()
    };

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    match cli.command {
        cli::Commands::Classify(args) => {
            cli::classify::handle_classify_command(args, config, global, cli.verbose, cli.quiet)?
        }

        cli::Commands::Rules {
            algorithm,
            rules,
            dump,
        } => {
            cli::init_stderr_logging(level);
            cli::rules::handle_rules_command(algorithm, rules, dump)?
        }

        cli::Commands::CheckRules { path } => {
            cli::init_stderr_logging(level);
            cli::rules::handle_check_rules_command(path)?
        }

        cli::Commands::Split {
            input,
            base_splitter,
            splitter_model,
            codec,
            json,
        } => {
            cli::init_stderr_logging(level);
            let codec = codec.or(config.settings.codec);
            cli::split::handle_split_command(input, base_splitter, splitter_model, codec, json)?
        }

        cli::Commands::TrainSplitter {
            inputs,
            output,
            codec,
            no_defaults,
        } => {
            cli::init_stderr_logging(level);
            let codec = codec.or(config.settings.codec);
            cli::split::handle_train_splitter_command(inputs, output, codec, no_defaults, cli.quiet)?
        }
    }

    Ok(())
}
