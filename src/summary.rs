use chrono::{DateTime, Local};
use colored::Colorize;
use salesview::formatting::truncate_label;
use salesview::{DashboardViews, NamedView};
use std::path::Path;

const COMPACT_ROWS: usize = 10;
const COMPACT_COLUMNS: usize = 4;
const COMPACT_CELL_WIDTH: usize = 24;

pub struct SummaryPaths<'a> {
    pub(crate) json: Option<&'a Path>,
    pub(crate) csv: Option<&'a Path>,
}

pub struct SummaryContext<'a> {
    pub(crate) payload_path: &'a Path,
    pub(crate) record_count: usize,
    pub(crate) run_started_at: &'a DateTime<Local>,
    pub(crate) paths: SummaryPaths<'a>,
    pub(crate) views: &'a DashboardViews,
    pub(crate) full_output: bool,
}

pub fn print_summary(context: &SummaryContext<'_>) {
    println!();
    print_summary_header(context);
    print_summary_paths(&context.paths);

    let mut widest = 0;
    for named in context.views.tables() {
        println!();
        println!("{}", named.widget.title().bold().bright_magenta());
        widest = widest.max(print_table(named, context.full_output));
    }
    if widest > 0 {
        println!("{}", "=".repeat(widest).bright_cyan());
    }
}

fn print_summary_header(context: &SummaryContext<'_>) {
    let views = context.views;
    println!(
        "{}",
        "====================== SalesView Compile ======================"
            .bold()
            .bright_cyan()
    );
    println!(
        "{} {}",
        "Run started".bright_yellow().bold(),
        context
            .run_started_at
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
            .bright_white()
    );
    println!(
        "{} {}",
        "Payload".bright_yellow().bold(),
        context.payload_path.display().to_string().bright_white()
    );
    let label = views.label.as_deref().unwrap_or("-");
    println!(
        "{} {} | {} | {}",
        "Period".bright_yellow().bold(),
        views.period.to_string().bright_white(),
        format!("Window: {label}").bright_white(),
        format!("Records: {}", context.record_count).bright_white()
    );
    let degraded = format!("Degraded records: {}", views.degraded_records);
    let divergent = format!("Rate divergences: {}", views.rate_divergences);
    println!(
        "{} {} | {}",
        "Checks".bright_yellow().bold(),
        if views.degraded_records > 0 {
            degraded.bright_red()
        } else {
            degraded.bright_white()
        },
        if views.rate_divergences > 0 {
            divergent.bright_red()
        } else {
            divergent.bright_white()
        }
    );
}

fn print_summary_paths(paths: &SummaryPaths<'_>) {
    print_path_line("View models JSON", paths.json, "not saved (use --save-json)");
    print_path_line("Tables CSV", paths.csv, "not saved (use --save-csv)");
}

fn print_path_line(label: &str, path: Option<&Path>, hint: &str) {
    let label_colored = label.bright_yellow().bold();
    match path {
        Some(path) => println!("{} {}", label_colored, path.display().to_string().bright_white()),
        None => println!("{} {}", label_colored, hint.bright_black()),
    }
}

/// Prints one table view and returns the width of its widest line.
fn print_table(named: &NamedView, full_output: bool) -> usize {
    let view = &named.view;
    if view.rows.is_empty() {
        let message = "No data available.";
        println!("{}", message.bright_black());
        return message.len();
    }

    let column_limit = if full_output { usize::MAX } else { COMPACT_COLUMNS };
    let row_limit = if full_output { usize::MAX } else { COMPACT_ROWS };

    let header: Vec<String> = std::iter::once("Name".to_string())
        .chain(view.series_names.iter().cloned())
        .take(column_limit)
        .collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .take(row_limit)
        .map(|cells| {
            cells
                .iter()
                .take(column_limit)
                .map(|cell| {
                    if full_output {
                        cell.clone()
                    } else {
                        truncate_label(cell, COMPACT_CELL_WIDTH)
                    }
                })
                .collect()
        })
        .collect();

    let widths = column_widths(&header, &rows);
    let header_line = render_line(&header, &widths);
    let separator = widths
        .iter()
        .map(|width| "-".repeat(width + 2))
        .collect::<Vec<_>>()
        .join("+");
    let mut max_width = header_line.chars().count().max(separator.len());

    println!("{}", header_line.bold().bright_white());
    println!("{}", separator.bright_black());
    for row in &rows {
        let line = render_line(row, &widths);
        max_width = max_width.max(line.chars().count());
        println!("{}", line.bright_green());
    }

    let hidden_rows = view.rows.len().saturating_sub(rows.len());
    let hidden_columns = (view.series_names.len() + 1).saturating_sub(header.len());
    if hidden_rows > 0 || hidden_columns > 0 {
        let message = format!(
            "... {hidden_rows} more rows, {hidden_columns} more columns (use --full-output to display all)."
        );
        max_width = max_width.max(message.len());
        println!("{}", message.bright_black());
    }

    max_width
}

fn column_widths(header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

/// Name column left-aligned, values right-aligned.
fn render_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, &width))| {
            if idx == 0 {
                format!(" {cell:<width$} ")
            } else {
                format!(" {cell:>width$} ")
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_line_aligns_name_and_values() {
        let cells = vec!["Alice".to_string(), "$1.00".to_string()];
        assert_eq!(render_line(&cells, &[7, 7]), " Alice   |   $1.00 ");
    }

    #[test]
    fn test_column_widths_cover_header_and_cells() {
        let header = vec!["Name".to_string(), "Change".to_string()];
        let rows = vec![vec!["Wireless Earbuds".to_string(), "+20.00%".to_string()]];
        assert_eq!(column_widths(&header, &rows), [16, 7]);
    }
}
