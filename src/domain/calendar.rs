//! Calendar-month arithmetic for installment scheduling.
//!
//! Due months advance by whole calendar months, never fixed 30-day hops:
//! Jan 31 + 1 month lands on the last day of February.

use chrono::{Months, NaiveDate};

/// Advance a date by whole calendar months, clamping the day of month to the
/// target month's length. Returns `None` only when the result would leave
/// chrono's representable range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// `YYYY-MM` label for the month containing `date`.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
