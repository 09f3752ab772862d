// 💰 Currency normalization
//
// Totals travel through the system as display strings ("Rs. 1,000") because
// they can be edited by hand. Everything that does arithmetic on them goes
// through parse_amount first.
//
// Accepted inputs: "Rs. 50,000", "50000", "₹ 1,20,000.50", 75250.5
// Ambiguous inputs ("1.500,25", "1.2.3") fall back to their digits.

/// Currency prefix used for every rendered amount
pub const CURRENCY_PREFIX: &str = "Rs.";

/// Heterogeneous money input: either free text or an already numeric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoneyInput<'a> {
    Text(&'a str),
    Number(f64),
}

impl<'a> From<&'a str> for MoneyInput<'a> {
    fn from(value: &'a str) -> Self {
        MoneyInput::Text(value)
    }
}

impl<'a> From<&'a String> for MoneyInput<'a> {
    fn from(value: &'a String) -> Self {
        MoneyInput::Text(value.as_str())
    }
}

impl From<f64> for MoneyInput<'_> {
    fn from(value: f64) -> Self {
        MoneyInput::Number(value)
    }
}

impl From<i64> for MoneyInput<'_> {
    fn from(value: i64) -> Self {
        MoneyInput::Number(value as f64)
    }
}

impl From<u64> for MoneyInput<'_> {
    fn from(value: u64) -> Self {
        MoneyInput::Number(value as f64)
    }
}

impl MoneyInput<'_> {
    pub fn amount(&self) -> f64 {
        match self {
            MoneyInput::Text(text) => parse_amount(text),
            MoneyInput::Number(n) if n.is_finite() => *n,
            MoneyInput::Number(_) => 0.0,
        }
    }
}

/// Extract a numeric amount from a display string
///
/// Non-numeric characters are stripped. Unparseable input yields 0.0.
pub fn parse_amount(text: &str) -> f64 {
    let Some(first_digit) = text.find(|c: char| c.is_ascii_digit()) else {
        return 0.0;
    };

    let prefix = text[..first_digit].trim();
    let negative = prefix.starts_with('-') || prefix.ends_with('-');

    let numeric: String = text[first_digit..]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let last_dot = numeric.rfind('.');
    let last_comma = numeric.rfind(',');
    let dots = numeric.matches('.').count();

    let ambiguous = dots > 1
        || matches!((last_dot, last_comma), (Some(d), Some(c)) if c > d);

    let cleaned: String = if ambiguous {
        numeric.chars().filter(|c| c.is_ascii_digit()).collect()
    } else {
        numeric.chars().filter(|c| *c != ',').collect()
    };

    let value = cleaned.parse::<f64>().unwrap_or(0.0);
    if negative {
        -value
    } else {
        value
    }
}

/// Normalize any money input to "Rs. N,NNN.NN"
pub fn format_currency<'a>(input: impl Into<MoneyInput<'a>>) -> String {
    render(input.into().amount(), true)
}

/// Format a running total: "Rs. 1,500", decimals only when fractional
pub fn format_total(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let fractional = ((amount * 100.0).round() as i64) % 100 != 0;
    render(amount, fractional)
}

/// Add a contribution amount to a display total
pub fn add_to_total(total: &str, amount: f64) -> String {
    format_total(parse_amount(total) + amount)
}

fn render(amount: f64, with_decimals: bool) -> String {
    // Sign follows the rounded value, so -0.001 renders as zero
    let cents = (amount * 100.0).round();
    let sign = if cents < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", (cents / 100.0).abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = group_thousands(int_part);
    if with_decimals {
        format!("{} {}{}.{}", CURRENCY_PREFIX, sign, grouped, frac_part)
    } else {
        format!("{} {}{}", CURRENCY_PREFIX, sign, grouped)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency_from_display_string() {
        assert_eq!(format_currency("Rs. 50,000"), "Rs. 50,000.00");
        assert_eq!(format_currency("1234567.891"), "Rs. 1,234,567.89");
    }

    #[test]
    fn test_format_currency_from_number() {
        assert_eq!(format_currency(75250.5), "Rs. 75,250.50");
        assert_eq!(format_currency(0u64), "Rs. 0.00");
        assert_eq!(format_currency(999i64), "Rs. 999.00");
    }

    #[test]
    fn test_format_currency_garbage() {
        assert_eq!(format_currency("garbage"), "Rs. 0.00");
        assert_eq!(format_currency(""), "Rs. 0.00");
        assert_eq!(format_currency(f64::NAN), "Rs. 0.00");
    }

    #[test]
    fn test_parse_amount_ambiguous_separators() {
        // Multiple dots: digits only
        assert_eq!(parse_amount("1.2.3"), 123.0);
        // Comma after dot: digits only
        assert_eq!(parse_amount("1.500,25"), 150025.0);
        // Indian grouping is fine
        assert_eq!(parse_amount("₹ 1,20,000.50"), 120000.5);
    }

    #[test]
    fn test_parse_amount_negative() {
        assert_eq!(parse_amount("-Rs. 200"), -200.0);
        assert_eq!(parse_amount("- 200"), -200.0);
        assert_eq!(parse_amount("Rs. -200"), -200.0);
    }

    #[test]
    fn test_format_total_drops_zero_decimals() {
        assert_eq!(format_total(1500.0), "Rs. 1,500");
        assert_eq!(format_total(1500.25), "Rs. 1,500.25");
        assert_eq!(format_total(0.0), "Rs. 0");
    }

    #[test]
    fn test_negative_rounding_to_zero_has_no_sign() {
        assert_eq!(format_currency(-0.001), "Rs. 0.00");
        assert_eq!(format_total(-0.001), "Rs. 0");
        assert_eq!(format_currency(-0.005), "Rs. -0.01");
        assert_eq!(format_total(-250.0), "Rs. -250");
    }

    #[test]
    fn test_add_to_total() {
        assert_eq!(add_to_total("Rs. 1,000", 500.0), "Rs. 1,500");
        assert_eq!(add_to_total("", 250.0), "Rs. 250");
        assert_eq!(add_to_total("Rs. 999,999", 1.0), "Rs. 1,000,000");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("100000"), "100,000");
    }
}
