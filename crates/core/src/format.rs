use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_PREFIX: &str = "Rs.";

/// Formats an amount in rupees, e.g. `Rs. 3,000` or `Rs. 1,499.50`.
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let absolute = rounded.abs();

    let whole = absolute.trunc();
    let fraction = (absolute - whole).normalize();

    let grouped = group_thousands(&whole.normalize().to_string());
    let sign = if negative { "-" } else { "" };

    if fraction.is_zero() {
        format!("{CURRENCY_PREFIX} {sign}{grouped}")
    } else {
        let cents = (fraction * Decimal::ONE_HUNDRED).trunc().normalize().to_string();
        format!("{CURRENCY_PREFIX} {sign}{grouped}.{cents:0>2}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
