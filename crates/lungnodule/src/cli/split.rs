use console::style;
use lungnodule_lib::index::{decode, resolve_encoding, scan_directory, ScanOptions};
use lungnodule_lib::{LogSink, PunktParameters, PunktTrainer, Result, SplitterKind};
use std::io::Read;
use std::path::{Path, PathBuf};

fn read_input(input: &Path, codec: Option<&str>) -> Result<String> {
    let encoding = resolve_encoding(codec.unwrap_or("utf-8"))?;
    let bytes = if input == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(input)?
    };
    decode(&input.display().to_string(), &bytes, encoding)
}

pub fn handle_split_command(
    input: PathBuf,
    base_splitter: bool,
    splitter_model: Option<PathBuf>,
    codec: Option<String>,
    json: bool,
) -> Result<()> {
    let splitter = match (base_splitter, splitter_model) {
        (true, _) => SplitterKind::base(),
        (false, Some(path)) => SplitterKind::punkt(PunktParameters::from_file(path)?),
        (false, None) => SplitterKind::default(),
    };

    let text = read_input(&input, codec.as_deref())?;
    let sentences = splitter.split(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&sentences)?);
    } else {
        for sentence in &sentences {
            println!("{}\t{}", sentence.index, sentence.text.replace('\n', " "));
        }
    }

    Ok(())
}

pub fn handle_train_splitter_command(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    codec: Option<String>,
    no_defaults: bool,
    quiet: bool,
) -> Result<()> {
    let sink = LogSink::default();
    let mut trainer = PunktTrainer::new();
    let mut documents = 0;

    for input in &inputs {
        let paths = if input.is_dir() {
            let options = ScanOptions {
                recursive: true,
                ..Default::default()
            };
            let (files, _) = scan_directory(input, &options, &sink)?;
            files.into_iter().map(|f| f.path).collect()
        } else {
            vec![input.clone()]
        };

        for path in paths {
            match read_input(&path, codec.as_deref()) {
                Ok(text) => {
                    trainer.train(&text);
                    documents += 1;
                }
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    let tokens = trainer.token_count();
    let base = if no_defaults {
        PunktParameters::default()
    } else {
        PunktParameters::english()
    };
    let params = trainer.finalize(base);
    params.save_to_file(&output)?;

    if !quiet {
        println!(
            "{} Trained on {} documents ({} tokens): {} abbreviations, {} sentence starters",
            style("✓").green(),
            documents,
            tokens,
            params.abbrev_types.len(),
            params.sent_starters.len()
        );
        println!("{} Parameters written to {}", style(">>>").cyan(), output.display());
    }

    Ok(())
}
