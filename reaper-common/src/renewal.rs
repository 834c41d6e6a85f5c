//! Renewal countdown, cost totals and reminder firing times
//!
//! A renewal date is a calendar date; its instant is 00:00 UTC of that date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Days within which a renewal is flagged as a warning
pub const WARNING_WINDOW_DAYS: i64 = 5;

/// Reminder preferences for one subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub five_days: bool,
    pub two_days: bool,
    pub one_day: bool,
    pub one_hour: bool,
}

impl Reminders {
    /// Enabled reminders paired with their lead time before renewal
    pub fn enabled_offsets(&self) -> Vec<Duration> {
        [
            (self.five_days, Duration::days(5)),
            (self.two_days, Duration::days(2)),
            (self.one_day, Duration::days(1)),
            (self.one_hour, Duration::hours(1)),
        ]
        .into_iter()
        .filter_map(|(enabled, offset)| enabled.then_some(offset))
        .collect()
    }
}

/// Badge severity shown next to a renewal countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalSeverity {
    Destructive,
    Warning,
    Default,
}

/// Countdown label and severity for a renewal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalStatus {
    pub label: String,
    pub severity: RenewalSeverity,
}

/// Instant at which a subscription renews
pub fn renewal_instant(renewal_date: NaiveDate) -> DateTime<Utc> {
    renewal_date.and_time(NaiveTime::MIN).and_utc()
}

/// Whole days until renewal, rounded up
///
/// A renewal later today (relative to midnight UTC) counts as 0 days once
/// midnight has passed; anything partially in the future rounds up.
pub fn days_until_renewal(renewal_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let diff_ms = (renewal_instant(renewal_date) - now).num_milliseconds() as f64;
    // `as` saturates and maps -0.0 to 0
    (diff_ms / MILLIS_PER_DAY).ceil() as i64
}

/// Countdown label for a number of days until renewal
pub fn renewal_status(days: i64) -> RenewalStatus {
    let (label, severity) = match days {
        d if d < 0 => ("Expired".to_string(), RenewalSeverity::Destructive),
        0 => ("Today".to_string(), RenewalSeverity::Destructive),
        d if d <= WARNING_WINDOW_DAYS => (format!("{}d left", d), RenewalSeverity::Warning),
        d => (format!("{}d left", d), RenewalSeverity::Default),
    };
    RenewalStatus { label, severity }
}

/// Cost of one subscription across all seats
pub fn subscription_cost(seats: i64, cost_per_seat: f64) -> f64 {
    seats as f64 * cost_per_seat
}

/// Sum of seats x cost over all subscriptions
pub fn total_monthly_cost<I>(items: I) -> f64
where
    I: IntoIterator<Item = (i64, f64)>,
{
    items
        .into_iter()
        .map(|(seats, cost)| subscription_cost(seats, cost))
        .sum()
}

/// Display symbol for a currency code; unknown codes fall back to `$`
pub fn currency_symbol(code: &str) -> &'static str {
    match code.to_ascii_uppercase().as_str() {
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "CAD" => "C$",
        "AUD" => "A$",
        _ => "$",
    }
}

/// Format an amount with a currency symbol and two decimals
pub fn format_amount(code: &str, amount: f64) -> String {
    format!("{}{:.2}", currency_symbol(code), amount)
}

/// All reminder instants for a renewal, earliest first
pub fn reminder_instants(renewal_date: NaiveDate, reminders: &Reminders) -> Vec<DateTime<Utc>> {
    let renews_at = renewal_instant(renewal_date);
    let mut instants: Vec<_> = reminders
        .enabled_offsets()
        .into_iter()
        .map(|offset| renews_at - offset)
        .collect();
    instants.sort();
    instants
}

/// Earliest enabled reminder that has not fired yet
pub fn next_reminder_at(
    renewal_date: NaiveDate,
    reminders: &Reminders,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    reminder_instants(renewal_date, reminders)
        .into_iter()
        .find(|at| *at > now)
}

/// Parse a renewal date; accepts `YYYY-MM-DD` or an ISO timestamp whose date part is used
pub fn parse_renewal_date(input: &str) -> Option<NaiveDate> {
    let date_part = input.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
