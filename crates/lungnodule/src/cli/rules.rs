use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use lungnodule_lib::{Algorithm, Result, RuleSet, SearchConfig, SearchMethod};
use std::path::PathBuf;

fn load(algorithm: Option<String>, rules: Option<PathBuf>) -> Result<(RuleSet, String)> {
    match rules {
        Some(path) => {
            let source = std::fs::read_to_string(&path)?;
            Ok((RuleSet::from_toml(&source)?, source))
        }
        None => {
            let algorithm: Algorithm = algorithm.as_deref().unwrap_or("danforth").parse()?;
            Ok((algorithm.rule_set()?, algorithm.source().to_string()))
        }
    }
}

pub fn handle_rules_command(
    algorithm: Option<String>,
    rules: Option<PathBuf>,
    dump: bool,
) -> Result<()> {
    let (rule_set, source) = load(algorithm, rules)?;

    if dump {
        print!("{}", source);
        return Ok(());
    }

    println!("\n{}", style(format!("Rule table: {}", rule_set.name)).bold().cyan());
    if let Some(description) = &rule_set.description {
        println!("{}", style(description).dim());
    }
    println!("{}\n", style("═".repeat(80)).dim());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Order").fg(Color::Cyan),
        Cell::new("Rule").fg(Color::Cyan),
        Cell::new("Label").fg(Color::Cyan),
        Cell::new("Search").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
    ]);

    for (position, rule) in rule_set.rules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(rule.id),
            Cell::new(&rule.label),
            Cell::new(if rule.override_search { "r6psm" } else { "psm" }),
            Cell::new(rule.description.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{}\n", table);
    println!("  Default label: {}", style(&rule_set.default_label).bold());
    println!(
        "  Phrase sets: {}\n",
        rule_set
            .phrases
            .iter()
            .map(|(name, phrases)| format!("{} ({})", name, phrases.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(())
}

pub fn handle_check_rules_command(path: PathBuf) -> Result<()> {
    let rule_set = RuleSet::from_file(&path)?;

    for psm in [SearchMethod::String, SearchMethod::Tokens] {
        rule_set.compile(SearchConfig::new(psm, None))?;
    }

    println!(
        "{} {}: {} rules, {} phrase sets, default '{}'",
        style("✓").green(),
        path.display(),
        rule_set.rules.len(),
        rule_set.phrases.len(),
        rule_set.default_label
    );
    Ok(())
}
