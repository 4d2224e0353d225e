/// Round `value` to `decimal_places` using half-away-from-zero.
///
/// # Examples
///
/// ```
/// use sensor_core::formatting::round_to;
///
/// assert_eq!(round_to(22.3607, 2), 22.36);
/// assert_eq!(round_to(-1.236, 2), -1.24);
/// assert_eq!(round_to(7.0, 0), 7.0);
/// ```
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10_f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

/// Format a number with a fixed number of decimals, without grouping.
///
/// Used for every numeric cell of the processed CSV.
///
/// # Examples
///
/// ```
/// use sensor_core::formatting::format_fixed;
///
/// assert_eq!(format_fixed(26.0, 2), "26.00");
/// assert_eq!(format_fixed(1234.567, 2), "1234.57");
/// assert_eq!(format_fixed(-0.5, 1), "-0.5");
/// ```
pub fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{:.prec$}", value, prec = decimals)
}

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use sensor_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let rounded = round_to(value, decimals);
    let fixed = format_fixed(rounded.abs(), decimals as usize);
    let (digits, fraction) = match fixed.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // `-0.0` compares equal to zero, so values that round away print unsigned.
    if rounded < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(digits));
    if let Some(frac) = fraction {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a row count with thousands separators.
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use sensor_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to((part / whole) * 100.0, decimal_places)
}

/// Format a duration in seconds for the report.
///
/// * `< 60` s → `"12.50 s"`
/// * otherwise → `"2m 05s"` / `"1h 02m 05s"`
///
/// # Examples
///
/// ```
/// use sensor_core::formatting::format_seconds;
///
/// assert_eq!(format_seconds(12.5), "12.50 s");
/// assert_eq!(format_seconds(125.0), "2m 05s");
/// assert_eq!(format_seconds(3725.0), "1h 02m 05s");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    if seconds.abs() < 60.0 {
        return format!("{:.2} s", seconds);
    }
    let total = seconds.round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}{}h {:02}m {:02}s", sign, hours, mins, secs)
    } else {
        format!("{}{}m {:02}s", sign, mins, secs)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an ASCII digit string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
