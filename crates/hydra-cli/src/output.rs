//! Console output helpers, grounded on `dashflow-cli/src/output.rs`:
//! colored status lines plus a UTF8-bordered table for tabular commands.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

#[must_use]
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "ERROR:".bright_red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".bright_blue().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "WARNING:".bright_yellow().bold(), msg);
}
