use serde::Serialize;
use specpilot_core::update::{PlannedFile, UpdatePlan};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// One line per planned file, optionally capped at `limit` with a remainder count.
pub fn print_plan_files(plan: &UpdatePlan, limit: Option<usize>) {
    let (shown, rest): (&[PlannedFile], usize) = match limit {
        Some(n) => plan.preview(n),
        None => (plan.files.as_slice(), 0),
    };
    for file in shown {
        println!("  {:<8} {}", file.kind.to_string(), file.path.display());
    }
    if rest > 0 {
        println!("  ... and {rest} more");
    }
}
