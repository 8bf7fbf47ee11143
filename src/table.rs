use std::fmt::Write as _;

use crate::view::LocationSummary;

/// Column-aligned plain-text table. Cells that parse as numbers are
/// right-aligned, everything else left-aligned.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let cell = cell.replace(['\n', '\r', '\t'], " ");
            if is_numeric(&cell) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn is_numeric(cell: &str) -> bool {
    !cell.is_empty() && cell.trim_end_matches('%').parse::<f64>().is_ok()
}

pub fn summary_rows(summaries: &[LocationSummary]) -> Vec<Vec<String>> {
    let count = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into());
    summaries
        .iter()
        .map(|s| {
            vec![
                s.location.clone(),
                s.continent.clone().unwrap_or_default(),
                s.latest_date.format("%Y-%m-%d").to_string(),
                count(s.total_cases),
                count(s.total_deaths),
                s.death_rate
                    .map(|rate| format!("{rate:.2}%"))
                    .unwrap_or_else(|| "N/A".into()),
            ]
        })
        .collect()
}

pub const SUMMARY_HEADERS: [&str; 6] = [
    "location",
    "continent",
    "latest_date",
    "total_cases",
    "total_deaths",
    "death_rate",
];

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_aligns_columns() {
        let rows = vec![
            vec!["Kenya".to_string(), "1000".to_string()],
            vec!["South Africa".to_string(), "7".to_string()],
        ];
        let rendered = render_table(&["location", "cases"], &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "location      cases");
        assert_eq!(lines[1], "------------  -----");
        assert_eq!(lines[2], "Kenya          1000");
        assert_eq!(lines[3], "South Africa      7");
    }

    #[test]
    fn render_table_flattens_control_characters() {
        let rows = vec![vec!["a\tb".to_string()]];
        let rendered = render_table(&["name"], &rows);
        assert!(rendered.lines().any(|line| line == "a b"));
    }
}
