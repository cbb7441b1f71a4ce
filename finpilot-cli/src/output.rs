//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

use finpilot_core::domain::money::format_rupees;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Rupee amount, red when negative
pub fn money(amount: Decimal) -> String {
    let text = format_rupees(amount);
    if amount.is_sign_negative() && !amount.is_zero() {
        text.red().to_string()
    } else {
        text
    }
}

/// Shorten a hex digest for table display
pub fn short_digest(digest: &str) -> String {
    if digest.len() > 12 {
        format!("{}…", &digest[..12])
    } else {
        digest.to_string()
    }
}
