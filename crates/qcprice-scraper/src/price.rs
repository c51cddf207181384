//! Price-text normalization for storefront markup.
//!
//! Storefronts render prices as `"₹1,234.50"`, `"Rs. 99"`, `"MRP ₹45"` and
//! similar. The first numeric run wins; whatever currency marker precedes it
//! is ignored.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Integer part with optional `,` grouping, then an optional fraction. The
/// fraction is captured greedily so over-long fractions can be rejected.
static PRICE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d+)*)(?:\.(\d+))?").expect("valid price regex"));

/// Maximum number of fractional digits accepted in a price.
const MAX_FRACTION_DIGITS: usize = 2;

/// Result of normalizing a raw price string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedPrice {
    Price(Decimal),
    Unparsable,
}

impl ParsedPrice {
    #[must_use]
    pub fn value(self) -> Option<Decimal> {
        match self {
            ParsedPrice::Price(d) => Some(d),
            ParsedPrice::Unparsable => None,
        }
    }
}

/// Parses raw price text into a numeric value.
///
/// Returns [`ParsedPrice::Unparsable`] for empty input, input without
/// digits, or a first numeric run with more than two fractional digits.
#[must_use]
pub fn parse_price(raw: &str) -> ParsedPrice {
    let Some(caps) = PRICE_RUN.captures(raw) else {
        return ParsedPrice::Unparsable;
    };

    let integer = caps.get(1).map_or("", |m| m.as_str()).replace(',', "");
    let fraction = caps.get(2).map(|m| m.as_str());

    if fraction.is_some_and(|f| f.len() > MAX_FRACTION_DIGITS) {
        return ParsedPrice::Unparsable;
    }

    let normalized = match fraction {
        Some(f) => format!("{integer}.{f}"),
        None => integer,
    };

    Decimal::from_str(&normalized).map_or(ParsedPrice::Unparsable, ParsedPrice::Price)
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
