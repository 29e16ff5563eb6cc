//! Terminal rendering of subnet tables and allocation results.

use colored::Colorize;

use super::SubnetRow;
use crate::processing::AllocationOutcome;

const HEADERS: [&str; 8] = [
    "Subnet", "Mask", "Type", "Range", "Usable", "Hosts", "Note", "Color",
];

/// Format a value as a quoted, right-aligned field.
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// Print the subnet table, one line per row.
pub fn print_table(rows: &[SubnetRow]) {
    let cells: Vec<[String; 8]> = rows.iter().map(row_cells).collect();
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let header = HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{h:<w$}"))
        .collect::<Vec<String>>()
        .join("  ");
    println!("{}", header.bold());

    for (row, cell_row) in rows.iter().zip(&cells) {
        let line = cell_row
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<String>>()
            .join("  ");
        if row.note.is_empty() {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
}

/// Print allocation successes, spares and failures.
pub fn print_outcome(outcome: &AllocationOutcome) {
    if outcome.allocations.iter().any(|a| !a.is_spare()) {
        println!("{}", "Allocated Subnets:".green().bold());
        for alloc in outcome.named() {
            println!("  {}: {}", alloc.name, alloc.subnet);
        }
    }
    let spares: Vec<String> = outcome.spares().map(|a| a.subnet.to_string()).collect();
    if !spares.is_empty() {
        println!("{} {}", "Spare blocks:".dimmed(), spares.join(", ").dimmed());
    }
    if !outcome.errors.is_empty() {
        println!("{}", "Errors:".red().bold());
        for error in &outcome.errors {
            println!("  {}", error.red());
        }
    }
}

fn row_cells(row: &SubnetRow) -> [String; 8] {
    [
        row.subnet.clone(),
        row.mask.clone(),
        row.address_type.to_string(),
        row.range.clone(),
        row.usable.clone(),
        row.hosts.to_string(),
        row.note.clone(),
        row.color.clone(),
    ]
}
