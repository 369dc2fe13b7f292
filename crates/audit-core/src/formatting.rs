/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use audit_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by the relative epsilon so binary midpoints like 1.005 round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a cost amount using the configured currency presentation.
///
/// * symbol set → `"$1,235"` (whole units, symbol first)
/// * code set → `"1,235 USD"` (whole units, code last)
/// * neither → `"1,234.56"`
///
/// # Examples
///
/// ```
/// use audit_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56, "$", ""), "$1,235");
/// assert_eq!(format_currency(1234.56, "", "BRL"), "1,235 BRL");
/// assert_eq!(format_currency(1234.56, "", ""), "1,234.56");
/// ```
pub fn format_currency(amount: f64, symbol: &str, code: &str) -> String {
    if !symbol.is_empty() {
        return format!("{}{}", symbol, format_number(amount, 0));
    }
    if !code.is_empty() {
        return format!("{} {}", format_number(amount, 0), code);
    }
    format_number(amount, 2)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * part / max(total, 1)`, rounded to two decimals.
///
/// An empty total yields `0.0` rather than NaN.
pub fn share_pct(part: u64, total: u64) -> f64 {
    round2(100.0 * part as f64 / total.max(1) as f64)
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
