//! Parsing of captured field text into dates and numbers.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_decimal::Decimal;

lazy_static! {
    static ref FRENCH_MONTH: Regex = Regex::new(
        r"(?i)\b(janvier|janv|f[ée]vrier|f[ée]vr|mars|avril|avr|mai|juin|juillet|juil|ao[uû]t|septembre|sept|octobre|oct|novembre|nov|d[ée]cembre|d[ée]c)\b\.?"
    ).unwrap();

    static ref ORDINAL_FIRST: Regex = Regex::new(r"(?i)\b1er\b").unwrap();
}

/// Formats tried after the template's own `date_formats`.
///
/// Two-digit year formats come first: `%Y` would accept `24` as year 24.
const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d.%m.%y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Parse a date using the given strftime formats, then the built-in ones.
///
/// French month names are translated first, so `9 mars 2024` parses with
/// `%d %B %Y`.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let cleaned = translate_months(text.trim().trim_end_matches('.'));
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    formats
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_DATE_FORMATS.iter().copied())
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
}

fn translate_months(text: &str) -> String {
    let text = ORDINAL_FIRST.replace_all(text, "1");
    FRENCH_MONTH
        .replace_all(&text, |caps: &Captures| {
            let month = caps[1].to_lowercase();
            let english = match month.trim_end_matches('.') {
                "janvier" | "janv" => "January",
                "février" | "fevrier" | "févr" | "fevr" => "February",
                "mars" => "March",
                "avril" | "avr" => "April",
                "mai" => "May",
                "juin" => "June",
                "juillet" | "juil" => "July",
                "août" | "aout" => "August",
                "septembre" | "sept" => "September",
                "octobre" | "oct" => "October",
                "novembre" | "nov" => "November",
                _ => "December",
            };
            english.to_string()
        })
        .into_owned()
}

/// Parse a number written with a known decimal separator.
///
/// Thousands separators, currency symbols and spaces are dropped. A trailing
/// `%` turns the value into a fraction (`20%` gives `0.20`).
pub fn parse_number(text: &str, decimal_separator: char) -> Option<Decimal> {
    let trimmed = text.trim();
    let is_percent = trimmed.ends_with('%');
    let negative = is_negative(trimmed);

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == decimal_separator)
        .map(|c| if c == decimal_separator { '.' } else { c })
        .collect();

    finish_number(&cleaned, negative, is_percent)
}

/// Parse a number whose decimal separator is unknown (e.g. "1 234,56" or
/// "1,234.56"). The last of `,` and `.` is taken as the decimal separator.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let is_percent = trimmed.ends_with('%');
    let negative = is_negative(trimmed);

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        if is_thousands_grouping(&cleaned, ',') {
            cleaned.replace(',', "")
        } else {
            cleaned.replace(',', ".")
        }
    } else if cleaned.contains(',') && cleaned.contains('.') {
        let comma_pos = cleaned.rfind(',');
        let dot_pos = cleaned.rfind('.');
        match (comma_pos, dot_pos) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            _ => cleaned.replace(',', ""),
        }
    } else if is_thousands_grouping(&cleaned, '.') {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    finish_number(&normalized, negative, is_percent)
}

/// Leading minus, or an accounting-style `(12.50)`.
fn is_negative(trimmed: &str) -> bool {
    trimmed.starts_with('-') || (trimmed.starts_with('(') && trimmed.ends_with(')'))
}

/// `1,234,567` style: more than one separator, every group three digits.
fn is_thousands_grouping(s: &str, separator: char) -> bool {
    let groups: Vec<&str> = s.split(separator).collect();
    groups.len() > 2 && groups[1..].iter().all(|g| g.len() == 3)
}

fn finish_number(cleaned: &str, negative: bool, is_percent: bool) -> Option<Decimal> {
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut value = Decimal::from_str(cleaned).ok()?;
    if negative {
        value = -value;
    }
    if is_percent {
        value /= Decimal::ONE_HUNDRED;
    }
    Some(value)
}
