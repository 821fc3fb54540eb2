//! Conversion of raw monetary tokens into amounts.
//!
//! Statement text mixes `1.234,56` (pt-BR), `1,234.56` (en-US) and bare
//! thousand groupings such as `1.234.567` without any marker telling them
//! apart. Every ratio downstream depends on reading these correctly.

/// Parses a monetary token into a non-negative amount.
///
/// Never fails: anything that cannot be read yields `0.0`.
///
/// Rules, applied after stripping everything but digits and separators:
/// - both `.` and `,` present: the separator appearing last is the decimal point,
///   the other one groups thousands
/// - a single `.`: decimal point only when exactly two digits follow it
/// - several `.`: all of them group thousands
/// - a single `,`: decimal point
/// - several `,`: all of them group thousands
pub fn parse_amount(token: &str) -> f64 {
    let clean: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if clean.is_empty() {
        return 0.0;
    }

    let dots = clean.matches('.').count();
    let commas = clean.matches(',').count();

    let canonical = match (dots, commas) {
        (0, 0) => clean,
        (d, c) if d > 0 && c > 0 => {
            let last_dot = clean.rfind('.').unwrap_or(0);
            let last_comma = clean.rfind(',').unwrap_or(0);
            if last_comma > last_dot {
                clean.replace('.', "").replace(',', ".")
            } else {
                clean.replace(',', "")
            }
        }
        (1, 0) => {
            let fraction = clean.rsplit('.').next().unwrap_or("");
            if fraction.len() == 2 {
                clean
            } else {
                clean.replace('.', "")
            }
        }
        (_, 0) => clean.replace('.', ""),
        (0, 1) => clean.replace(',', "."),
        (0, _) => clean.replace(',', ""),
        _ => clean,
    };

    match canonical.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// True when the token is a bare four-digit number that reads as a fiscal year.
pub fn is_plausible_year(token: &str) -> bool {
    let token = token.trim();
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && token
            .parse::<u32>()
            .map(|year| (1900..=2099).contains(&year))
            .unwrap_or(false)
}
