//! Core pricing calculation functions.
//!
//! Pure functions for pricing math and input normalization - no settings
//! or network access.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;

use super::models::PriceLine;

/// Round to specified decimal places using commercial rounding (half-up,
/// away from zero), keeping exactly `places` decimals.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use household_quote::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_money(dec!(1.005), 2), dec!(1.01));
/// assert_eq!(round_money(dec!(300), 2).to_string(), "300.00");
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

/// Sum of line amounts, rounded to cents
pub fn sum_lines(lines: &[PriceLine]) -> Decimal {
    round_money(lines.iter().map(|l| l.amount).sum(), 2)
}

/// Read a rate setting as a fraction.
///
/// Values above 1 are taken as percentages (`10` means 10%). Negative rates
/// are treated as zero.
pub fn as_rate(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        Decimal::ZERO
    } else if value > Decimal::ONE {
        value / Decimal::ONE_HUNDRED
    } else {
        value
    }
}

/// Lenient numeric read of an untyped JSON field.
///
/// Accepts numbers and numeric strings (`"3"`, `" 2.5 "`, `"2,5"`).
/// Returns `None` for anything else, including `null`.
pub fn numeric_field(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().map(saturating_decimal)),
        Value::String(s) => {
            let s = s.trim().replace(',', ".");
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        _ => None,
    }
}

/// `f64` to Decimal, clamped to Decimal's range
fn saturating_decimal(f: f64) -> Decimal {
    Decimal::from_f64(f).unwrap_or(if f > 0.0 { Decimal::MAX } else { Decimal::MIN })
}

/// Whole units of `d`, truncated and clamped to `min..=u32::MAX`
fn whole_units(d: Decimal, min: u32) -> u32 {
    let max = Decimal::from(u32::MAX);
    if d >= max {
        u32::MAX
    } else {
        d.trunc().to_u32().unwrap_or(min).max(min)
    }
}

/// Whether a present field fails the lenient numeric read
pub fn is_non_numeric(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(v) => numeric_field(Some(v)).is_none(),
    }
}

/// Lenient boolean read (`true`, `1`, `"yes"`, `"ja"`)
pub fn flag_field(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "ja" | "on"
        ),
        _ => false,
    }
}

/// Rooms to price: `rooms` when given, else `flat_rooms`, truncated to
/// whole rooms, never less than 1.
///
/// A `rooms` value that is present but unreadable counts as 1 room; it does
/// not fall through to `flat_rooms`.
pub fn normalize_rooms(rooms: Option<&Value>, flat_rooms: Option<&Value>) -> u32 {
    let given = match rooms {
        None | Some(Value::Null) => flat_rooms,
        Some(_) => rooms,
    };
    numeric_field(given).map_or(1, |d| whole_units(d, 1))
}

/// Floors to price, truncated to whole floors, never less than 0.
pub fn normalize_floors(floors: Option<&Value>) -> u32 {
    numeric_field(floors).map_or(0, |d| whole_units(d, 0))
}

/// Floors above the second one, which carry a surcharge
pub fn extra_floors(floors: u32) -> u32 {
    floors.saturating_sub(2)
}
