use std::fmt;

/// Money is held as integer minor units (öre for SEK, cents for EUR/USD).
/// 11.00 SEK = 1100.
pub type Cents = i64;

/// Format minor units as a decimal string.
/// Example: 1100 -> "11.00", 5 -> "0.05"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a non-negative decimal price into minor units.
/// Accepts "30", "30.5" and "30.50". More than two decimals is an error,
/// since a price list should never silently lose precision.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() || input.starts_with('-') {
        return Err(ParseCentsError::InvalidFormat);
    }

    let (units, fraction) = match input.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (input, ""),
    };

    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units.is_empty() {
        0
    } else {
        units.parse().map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => fraction.parse().map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid price format"),
            ParseCentsError::Overflow => write!(f, "price is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(1100), "11.00");
        assert_eq!(format_cents(4050), "40.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-120), "-1.20");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("30"), Ok(3000));
        assert_eq!(parse_cents("30.5"), Ok(3050));
        assert_eq!(parse_cents("30.05"), Ok(3005));
        assert_eq!(parse_cents(".75"), Ok(75));
        assert_eq!(parse_cents(" 11.00 "), Ok(1100));
    }

    #[test]
    fn test_parse_cents_rejects_bad_input() {
        assert!(parse_cents("").is_err());
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("-5").is_err());
        assert!(parse_cents("1.234").is_err());
        assert!(parse_cents("1.2.3").is_err());
        assert_eq!(
            parse_cents("99999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }
}
