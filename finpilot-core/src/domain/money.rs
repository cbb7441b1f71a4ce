//! Amount formatting for user-facing messages

use rust_decimal::{Decimal, RoundingStrategy};

/// Format as rupees with two decimals and thousands separators ("₹12,345.50")
pub fn format_rupees(amount: Decimal) -> String {
    format!("₹{}", format_grouped(amount))
}

/// Two decimals with comma thousands separators ("12,345.50")
pub fn format_grouped(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}
