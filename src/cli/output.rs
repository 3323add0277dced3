use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress everything except errors and command results.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a success message.
pub fn success(msg: &str) {
    if !quiet() {
        println!("  {} {}", "✓".green(), msg);
    }
}

/// Print a warning message.
pub fn warning(msg: &str) {
    if !quiet() {
        println!("  {} {}", "⚠".yellow(), msg);
    }
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    if !quiet() {
        println!("\n{}", msg.bold());
    }
}

/// Print an aligned `label  value` line.
pub fn field(label: &str, value: &str) {
    println!("  {:<22} {}", format!("{label}:").dimmed(), value);
}

/// Print rows under bold headers, each column padded to its widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    println!("  {}", header_line.join("  ").bold());

    for row in rows {
        let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        println!("  {}", line.join("  ").trim_end());
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}
