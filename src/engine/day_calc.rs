use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::leave_request::DayPart;

/// Inclusive calendar-day count for a leave range, half a day off per
/// non-full boundary, floored at half a day. No holiday or business-day
/// awareness. Callers validate `end >= start` beforehand.
pub fn calculate_days(
    start: NaiveDate,
    end: NaiveDate,
    start_part: DayPart,
    end_part: DayPart,
) -> Decimal {
    let span = (end - start).num_days() + 1;
    let mut days = Decimal::from(span);
    if start_part.is_half() {
        days -= dec!(0.5);
    }
    if end_part.is_half() {
        days -= dec!(0.5);
    }
    days.max(dec!(0.5))
}
