//! Birthday matching rules.
//!
//! # Invariants
//! - Only month and day of the date of birth are compared; the year is
//!   ignored (it may be a placeholder).
//! - February 29 birthdays are celebrated on March 1 in non-leap years, so
//!   such users are still announced every year.

use chrono::{Datelike, NaiveDate};

/// Storage key `MM-DD` for a calendar date.
///
/// Matches the `users.birth_month_day` generated column.
pub fn month_day_key(date: NaiveDate) -> String {
    format!("{:02}-{:02}", date.month(), date.day())
}

/// Returns every date-of-birth key whose birthday falls on `date`.
///
/// Usually one key. On March 1 of a non-leap year `02-29` is included too.
pub fn birthday_keys_for(date: NaiveDate) -> Vec<String> {
    let mut keys = vec![month_day_key(date)];
    if date.month() == 3 && date.day() == 1 && !is_leap_year(date.year()) {
        keys.push("02-29".to_string());
    }
    keys
}

/// Returns whether a person born on `date_of_birth` has a birthday on `date`.
pub fn is_birthday_on(date_of_birth: NaiveDate, date: NaiveDate) -> bool {
    let born = month_day_key(date_of_birth);
    birthday_keys_for(date).iter().any(|key| *key == born)
}

/// Returns whether `year` has a February 29 in the proleptic Gregorian calendar.
pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}
