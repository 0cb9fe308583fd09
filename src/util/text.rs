/// Renders `value` with `decimals` fractional digits and a `,` between every
/// three integer digits.
///
/// Rounding is done by the standard float formatter, so the result matches the
/// exact binary value of `value` (`0.125` rounds to `0.12`).
///
/// # Example
///
/// ```ignore
/// assert_eq!(format_thousands(1234567.891, 2), "1,234,567.89");
/// ```
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(fixed.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // -0.00 這種情況不需要負號
    let sign = if grouped.chars().all(|c| c == '0' || c == ',')
        && fraction.map_or(true, |f| f.chars().all(|c| c == '0'))
    {
        ""
    } else {
        sign
    };

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// 美元金額，例︰67123.45 => $67,123.45
pub fn format_usd(value: f64) -> String {
    format!("${}", format_thousands(value, 2))
}

/// 推播到頻道的報價訊息（HTML）
pub fn price_update_message(amount: f64) -> String {
    format!("💰 <b>Bitcoin Price Update</b>\n\n{}", format_usd(amount))
}
