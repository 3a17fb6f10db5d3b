//! Locale-free display formatting for metric values and labels.
//!
//! Every function here is total: missing, non-finite or non-numeric input
//! renders as [`NOT_AVAILABLE`] instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_LABEL: &str = "unknown";

const CURRENCY_SYMBOL: &str = "$";
const COMPACT_THRESHOLD: f64 = 1000.0;
/// Largest first, so a value that rounds up into the next unit uses it.
const COMPACT_TIERS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "k")];
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    #[default]
    Plain,
    Currency,
    Percent,
}

/// Destination-dependent rendering: chart labels use `Compact`, tables and
/// tooltips use `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    #[default]
    Full,
    Compact,
}

pub fn format(value: Option<f64>, mode: FormatMode) -> String {
    format_styled(value, mode, FormatStyle::Full)
}

pub fn format_compact(value: Option<f64>, mode: FormatMode) -> String {
    format_styled(value, mode, FormatStyle::Compact)
}

pub fn format_styled(value: Option<f64>, mode: FormatMode, style: FormatStyle) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };
    match mode {
        FormatMode::Plain => format_plain(value, style),
        FormatMode::Currency => format_currency(value, style),
        FormatMode::Percent => format_percent(value),
    }
}

/// Formats a raw JSON field, accepting numbers and numeric strings.
pub fn format_json(value: &Value, mode: FormatMode, style: FormatStyle) -> String {
    format_styled(numeric_value(value), mode, style)
}

pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Distribution share with one decimal and no sign, e.g. `60.0%`.
pub fn format_share(share: Option<f64>) -> String {
    match share.filter(|v| v.is_finite()) {
        Some(share) => format!("{share:.1}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn truncate_label(label: &str, max_len: usize) -> String {
    if max_len == 0 || label.chars().count() <= max_len {
        return label.to_string();
    }
    let mut out: String = label.chars().take(max_len).collect();
    out.push_str(ELLIPSIS);
    out
}

fn format_percent(value: f64) -> String {
    let rendered = format!("{:.2}", value.abs());
    if rendered == "0.00" {
        return "0.00%".to_string();
    }
    let sign = if value > 0.0 { '+' } else { '-' };
    format!("{sign}{rendered}%")
}

fn format_currency(value: f64, style: FormatStyle) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if style == FormatStyle::Compact && magnitude >= COMPACT_THRESHOLD {
        return format!("{sign}{CURRENCY_SYMBOL}{}", compact_magnitude(magnitude));
    }
    let rendered = format!("{magnitude:.2}");
    if rendered == "0.00" {
        return format!("{CURRENCY_SYMBOL}0.00");
    }
    format!("{sign}{CURRENCY_SYMBOL}{}", group_thousands(&rendered))
}

fn format_plain(value: f64, style: FormatStyle) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if style == FormatStyle::Compact && magnitude >= COMPACT_THRESHOLD {
        return format!("{sign}{}", compact_magnitude(magnitude));
    }
    let rendered = if magnitude.fract() == 0.0 {
        format!("{magnitude:.0}")
    } else {
        format!("{magnitude:.2}")
    };
    if rendered.trim_start_matches(['0', '.']).is_empty() {
        return rendered;
    }
    format!("{sign}{}", group_thousands(&rendered))
}

/// One decimal in the largest unit whose rounded value is at least `1.0`.
fn compact_magnitude(magnitude: f64) -> String {
    let (scale, suffix) = COMPACT_TIERS
        .into_iter()
        .find(|(scale, _)| (magnitude / scale * 10.0).round() >= 10.0)
        .unwrap_or((COMPACT_THRESHOLD, "k"));
    format!("{:.1}{suffix}", magnitude / scale)
}

fn group_thousands(rendered: &str) -> String {
    let (integer_part, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered, None),
    };

    let mut grouped = String::with_capacity(rendered.len() + integer_part.len() / 3);
    for (idx, ch) in integer_part.chars().enumerate() {
        if idx > 0 && (integer_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}
