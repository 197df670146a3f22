//! # Temporal Utilities — ISO Dates and Date Shortcuts
//!
//! Two concerns live here:
//!
//! 1. Recognising the `YYYY-MM-DD` literal form. The instance builder
//!    coerces any textual value of exactly this shape into a date.
//! 2. Evaluating date shortcuts relative to a base date. A shortcut is a
//!    compact expression such as `T` (today), `-2B` (two days back, rolled
//!    to a business day), `3ME` (end of the month three months out) or
//!    `1QE` (end of next quarter).
//!
//! ## Shortcut Grammar
//!
//! `[TBDWMQY]* [+-]* \d* [DWMQY]* [SE]*`, case-insensitive. The unit is the
//! trailing unit letter, else the leading letter, else `D`. The count
//! defaults to 0 and the sign to `+`. A `B` anywhere in the pattern rolls a
//! weekend result onto a business day in the direction of the shift.

use chrono::{Datelike, Days, Months, NaiveDate, Utc, Weekday};

use crate::error::DateShortcutError;

/// Format string for ISO calendar dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether `text` has the exact shape `DDDD-DD-DD`.
///
/// Shape only; `2024-13-45` is recognised here and rejected later by
/// [`parse_iso_date`].
pub fn is_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Parse a `YYYY-MM-DD` literal, returning `None` for anything else.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    if !is_iso_date(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, ISO_DATE_FORMAT).ok()
}

/// Evaluate a date shortcut relative to today's UTC date.
pub fn shift_today(pattern: &str) -> Result<NaiveDate, DateShortcutError> {
    shift_date(pattern, Utc::now().date_naive())
}

/// Evaluate a date shortcut relative to `base`.
///
/// # Errors
///
/// - [`DateShortcutError::UnknownUnit`] when the resolved unit has no date
///   meaning (a pattern consisting of a bare `B`).
/// - [`DateShortcutError::ConflictingAdjust`] when both `S` and `E` appear.
/// - [`DateShortcutError::OutOfRange`] when the count or the shifted date
///   overflows.
pub fn shift_date(pattern: &str, base: NaiveDate) -> Result<NaiveDate, DateShortcutError> {
    let upper = pattern.to_uppercase();
    let parts = Shortcut::scan(&upper);

    let mult: i64 = if parts.sign == Some('-') { -1 } else { 1 };
    let unit = parts.unit.or(parts.lead).unwrap_or('D');
    let count: i64 = match parts.digits {
        "" => 0,
        digits => digits
            .parse::<i64>()
            .map_err(|_| DateShortcutError::OutOfRange {
                pattern: pattern.to_string(),
            })?,
    };

    let shifted = dated(base, unit, count * mult).map_err(|e| match e {
        Dated::UnknownUnit => DateShortcutError::UnknownUnit {
            pattern: pattern.to_string(),
            unit,
        },
        Dated::OutOfRange => DateShortcutError::OutOfRange {
            pattern: pattern.to_string(),
        },
    })?;

    move_date(shifted, &upper, mult).ok_or_else(|| {
        if upper.contains('S') && upper.contains('E') {
            DateShortcutError::ConflictingAdjust {
                pattern: pattern.to_string(),
            }
        } else {
            DateShortcutError::OutOfRange {
                pattern: pattern.to_string(),
            }
        }
    })
}

/// Lexical pieces of a shortcut. Each repeated group keeps its last match.
struct Shortcut<'a> {
    lead: Option<char>,
    sign: Option<char>,
    digits: &'a str,
    unit: Option<char>,
}

impl<'a> Shortcut<'a> {
    fn scan(text: &'a str) -> Self {
        let mut rest = text;
        let lead = take_last(&mut rest, |c| "TBDWMQY".contains(c));
        let sign = take_last(&mut rest, |c| c == '+' || c == '-');
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(end);
        rest = tail;
        let unit = take_last(&mut rest, |c| "DWMQY".contains(c));
        Self {
            lead,
            sign,
            digits,
            unit,
        }
    }
}

/// Consume the longest prefix of chars matching `pred`, returning the last.
fn take_last(rest: &mut &str, pred: impl Fn(char) -> bool) -> Option<char> {
    let mut last = None;
    let mut consumed = 0;
    for c in rest.chars() {
        if !pred(c) {
            break;
        }
        last = Some(c);
        consumed += c.len_utf8();
    }
    *rest = &rest[consumed..];
    last
}

enum Dated {
    UnknownUnit,
    OutOfRange,
}

fn dated(base: NaiveDate, unit: char, periods: i64) -> Result<NaiveDate, Dated> {
    match unit {
        'T' => Ok(base),
        'D' => add_days(base, periods).ok_or(Dated::OutOfRange),
        'W' => periods
            .checked_mul(7)
            .and_then(|days| add_days(base, days))
            .ok_or(Dated::OutOfRange),
        'M' => add_months(base, periods).ok_or(Dated::OutOfRange),
        'Q' => {
            let shifted = periods
                .checked_mul(3)
                .and_then(|months| add_months(base, months))
                .ok_or(Dated::OutOfRange)?;
            let month = ((shifted.month() - 1) / 3 + 1) * 3;
            let day = if month == 3 || month == 12 { 31 } else { 30 };
            NaiveDate::from_ymd_opt(shifted.year(), month, day).ok_or(Dated::OutOfRange)
        }
        'Y' => NaiveDate::from_ymd_opt(base.year(), 12, 31).ok_or(Dated::OutOfRange),
        _ => Err(Dated::UnknownUnit),
    }
}

/// Apply the `S`/`E` month adjustment and the `B` business-day roll.
/// Returns `None` on conflicting adjustments or overflow.
fn move_date(base: NaiveDate, pattern: &str, mult: i64) -> Option<NaiveDate> {
    let has_start = pattern.contains('S');
    let has_end = pattern.contains('E');
    let mut date = match (has_start, has_end) {
        (true, true) => return None,
        (true, false) => base.with_day(1)?,
        (false, true) => base
            .with_day(1)?
            .checked_add_months(Months::new(1))?
            .checked_sub_days(Days::new(1))?,
        (false, false) => base,
    };
    if pattern.contains('B') {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = add_days(date, mult)?;
        }
    }
    Some(date)
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn base_date() -> impl Strategy<Value = NaiveDate> {
        (1990i32..2100, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn shift() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["", "+", "-"]),
            0u32..120,
            prop::sample::select(vec!["D", "W", "M", "Q", "Y"]),
        )
            .prop_map(|(sign, n, unit)| format!("{sign}{n}{unit}"))
    }

    proptest! {
        /// `S` always lands on the first of a month.
        #[test]
        fn start_lands_on_first(base in base_date(), pattern in shift()) {
            let date = shift_date(&format!("{pattern}S"), base).unwrap();
            prop_assert_eq!(date.day(), 1);
        }

        /// `E` always lands on the last day of a month.
        #[test]
        fn end_lands_on_last(base in base_date(), pattern in shift()) {
            let date = shift_date(&format!("{pattern}E"), base).unwrap();
            prop_assert_eq!(date.succ_opt().unwrap().day(), 1);
        }

        /// `B` never lands on a weekend.
        #[test]
        fn business_roll_avoids_weekends(base in base_date(), pattern in shift()) {
            let date = shift_date(&format!("{pattern}B"), base).unwrap();
            prop_assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
        }

        /// Plain day shifts match calendar arithmetic.
        #[test]
        fn day_shift_is_calendar_arithmetic(base in base_date(), n in -400i64..400) {
            let date = shift_date(&format!("{n}D"), base).unwrap();
            prop_assert_eq!(date, base + chrono::Duration::days(n));
        }
    }
}
