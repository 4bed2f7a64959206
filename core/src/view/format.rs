pub const CURRENCY_SYMBOL: &str = "₹";

/// `part / whole * 100`; an empty or non-finite whole yields 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() || !part.is_finite() {
        0.0
    } else {
        part / whole * 100.0
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}

/// Currency at display precision: at most two decimals, trailing zeros dropped.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{CURRENCY_SYMBOL}{}", group_digits(trimmed))
}

pub fn format_currency_fixed(amount: f64, decimals: usize) -> String {
    format!(
        "{CURRENCY_SYMBOL}{}",
        group_digits(&format!("{:.*}", decimals, amount))
    )
}

pub fn format_count(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Thousands-grouped number with at most one decimal.
pub fn format_number(value: f64) -> String {
    let fixed = format!("{:.1}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    group_digits(trimmed)
}

fn group_digits(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
