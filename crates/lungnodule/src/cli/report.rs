use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use lungnodule_lib::report::Summary;

pub fn print_summary(summary: &Summary) {
    eprintln!("\n{}", style("Decision Summary").bold());
    eprintln!("{}", style("─".repeat(60)).dim());

    if summary.total == 0 {
        eprintln!("{}\n", style("No reports processed").yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Decision").fg(Color::Cyan),
        Cell::new("Reports").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
    ]);

    for (label, count) in &summary.by_label {
        let label_cell = if label.starts_with("error:") {
            Cell::new(label).fg(Color::Red)
        } else {
            Cell::new(label)
        };
        table.add_row(vec![
            label_cell,
            Cell::new(count),
            Cell::new(format!("{:.1}%", *count as f64 * 100.0 / summary.total as f64)),
        ]);
    }

    eprintln!("{}\n", table);
    eprintln!("  Reports: {}", style(summary.total).bold());
    if summary.failed > 0 {
        eprintln!("  Failed: {}", style(summary.failed).red());
    }
    if let Some(largest) = summary.largest_size {
        eprintln!(
            "  Sizes found: {} (largest {} mm)",
            summary.with_size,
            style(largest).yellow()
        );
    }
    eprintln!();
}
