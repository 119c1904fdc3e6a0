//! Builtin filter implementations.
//!
//! Filters take the current value plus literal arguments and produce a new
//! value. String filters coerce scalar input to its text form and pass
//! sequences and mappings through untouched, so the implicit escape filter
//! appended by the policy never corrupts a collection that is about to be
//! iterated.

use crate::error::{Result, StencilError};
use crate::scope::{as_number, is_truthy, to_output};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

fn filter_error(name: &str, message: impl Into<String>) -> StencilError {
    StencilError::Filter { name: name.to_string(), message: message.into() }
}

/// Apply `f` to the text form of a scalar; collections pass through.
fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => value.clone(),
        scalar => Value::String(f(&to_output(scalar))),
    }
}

fn arg_str(args: &[Value], index: usize) -> Option<String> {
    args.get(index).map(to_output)
}

/// HTML-escape scalar markup into entities.
pub fn escape(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                other => out.push(other),
            }
        }
        out
    }))
}

/// Uppercase the input string.
pub fn upper(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| s.to_uppercase()))
}

/// Lowercase the input string.
pub fn lower(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| s.to_lowercase()))
}

/// Capitalize the first letter of the input string.
pub fn capitalize(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }))
}

/// Capitalize the first letter of every word.
pub fn title(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for ch in s.chars() {
            if at_word_start && ch.is_alphabetic() {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = ch.is_whitespace();
        }
        out
    }))
}

/// Trim the given characters (default: spaces) from both ends.
pub fn trim(value: &Value, args: &[Value]) -> Result<Value> {
    let what = arg_str(args, 0).unwrap_or_else(|| " ".to_string());
    Ok(map_text(value, |s| {
        s.trim_matches(|c: char| what.contains(c)).to_string()
    }))
}

/// Element count of a sequence or mapping, character count otherwise.
pub fn length(value: &Value, _args: &[Value]) -> Result<Value> {
    let len = match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        scalar => to_output(scalar).chars().count(),
    };
    Ok(Value::from(len))
}

/// Join a sequence into one string with the given separator (default ", ").
pub fn join(value: &Value, args: &[Value]) -> Result<Value> {
    let separator = arg_str(args, 0).unwrap_or_else(|| ", ".to_string());
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_output).collect();
            Ok(Value::String(parts.join(&separator)))
        }
        other => Ok(other.clone()),
    }
}

/// Encode the value as JSON text.
pub fn json(value: &Value, _args: &[Value]) -> Result<Value> {
    serde_json::to_string(value)
        .map(Value::String)
        .map_err(|e| filter_error("json", e.to_string()))
}

/// Substitute a default when the value is null-like.
pub fn by_default(value: &Value, args: &[Value]) -> Result<Value> {
    if is_truthy(value) {
        Ok(value.clone())
    } else {
        Ok(args.first().cloned().unwrap_or(Value::String(String::new())))
    }
}

/// Absolute value of a numeric input.
pub fn abs(value: &Value, _args: &[Value]) -> Result<Value> {
    let n = as_number(value).ok_or_else(|| filter_error("abs", "expected a number"))?;
    Ok(Value::from(n.abs()))
}

/// Format a number with fixed decimals and separators.
///
/// Arguments: decimals (default 2), decimal separator (default ","),
/// thousands separator (default " ").
pub fn number_format(value: &Value, args: &[Value]) -> Result<Value> {
    let n = as_number(value).ok_or_else(|| filter_error("numberFormat", "expected a number"))?;
    let decimals = args
        .first()
        .and_then(as_number)
        .map(|d| d.max(0.0) as usize)
        .unwrap_or(2);
    let dec_sep = arg_str(args, 1).unwrap_or_else(|| ",".to_string());
    let thou_sep = arg_str(args, 2).unwrap_or_else(|| " ".to_string());

    let formatted = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(&thou_sep);
        }
        grouped.push(*ch);
    }

    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push_str(&dec_sep);
        out.push_str(&frac);
    }
    Ok(Value::String(out))
}

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

/// Remove markup tags from the input string.
pub fn strip_tags(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| TAG.replace_all(s, "").into_owned()))
}

/// Percent-encode the input for use in a URL query component.
pub fn url_encode(value: &Value, _args: &[Value]) -> Result<Value> {
    Ok(map_text(value, |s| {
        let mut out = String::with_capacity(s.len());
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                    out.push(byte as char)
                }
                b' ' => out.push('+'),
                other => out.push_str(&format!("%{:02X}", other)),
            }
        }
        out
    }))
}

/// Format a date/time value.
///
/// Accepts a unix timestamp (number) or a datetime string (RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`); the optional argument is a
/// strftime format, default `%d.%m.%Y %H:%M:%S`.
pub fn date(value: &Value, args: &[Value]) -> Result<Value> {
    let format = arg_str(args, 0).unwrap_or_else(|| "%d.%m.%Y %H:%M:%S".to_string());
    let datetime = parse_datetime(value)
        .ok_or_else(|| filter_error("date", format!("cannot interpret {value} as a date")))?;
    Ok(Value::String(datetime.format(&format).to_string()))
}

/// Shift a date/time value by a relative expression and return the
/// resulting unix timestamp.
///
/// The expression is one or more signed `<amount> <unit>` terms, e.g.
/// `+1 day` or `-2 hours +30 minutes`; units are second, minute, hour,
/// day, week, month and year (plural accepted). Returning a timestamp
/// lets the result chain into `date` for formatting.
pub fn modify_date(value: &Value, args: &[Value]) -> Result<Value> {
    let how = arg_str(args, 0)
        .ok_or_else(|| filter_error("modifyDate", "expected a modification argument"))?;
    let datetime = parse_datetime(value)
        .ok_or_else(|| filter_error("modifyDate", format!("cannot interpret {value} as a date")))?;
    let shifted = shift_datetime(datetime, &how)
        .ok_or_else(|| filter_error("modifyDate", format!("cannot apply modification '{how}'")))?;
    Ok(Value::from(shifted.timestamp()))
}

fn shift_datetime(start: DateTime<Utc>, how: &str) -> Option<DateTime<Utc>> {
    let mut current = start;
    let mut terms = how.split_whitespace();
    let mut applied = false;

    while let Some(amount) = terms.next() {
        let amount: i64 = amount.parse().ok()?;
        let unit = terms.next()?.trim_end_matches('s');
        current = match unit {
            "second" => current.checked_add_signed(Duration::seconds(amount))?,
            "minute" => current.checked_add_signed(Duration::minutes(amount))?,
            "hour" => current.checked_add_signed(Duration::hours(amount))?,
            "day" => current.checked_add_signed(Duration::days(amount))?,
            "week" => current.checked_add_signed(Duration::weeks(amount))?,
            "month" => shift_months(current, amount)?,
            "year" => shift_months(current, amount.checked_mul(12)?)?,
            _ => return None,
        };
        applied = true;
    }

    applied.then_some(current)
}

fn shift_months(datetime: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        datetime.checked_add_months(months)
    } else {
        datetime.checked_sub_months(months)
    }
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(n) = value.as_i64() {
        return DateTime::from_timestamp(n, 0);
    }
    let text = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(day.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
