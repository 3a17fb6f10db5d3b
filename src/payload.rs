//! Raw dashboard payloads as returned by the analytics service.
//!
//! Records are kept as loosely typed JSON objects; every accessor degrades to
//! `None` instead of failing, so a malformed record never aborts a compile.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::formatting::{UNKNOWN_LABEL, numeric_value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Non-object values become an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(numeric_value)
    }

    pub fn first_number(&self, fields: &[&str]) -> Option<f64> {
        fields.iter().find_map(|field| self.number(field))
    }

    /// Strings are trimmed; numbers are accepted as identifiers (numeric SKUs).
    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    pub fn first_text(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|field| self.text(field))
    }

    /// Fields that are present but hold a value of the wrong JSON type.
    pub fn type_mismatches<'a>(
        &self,
        text_fields: &[&'a str],
        number_fields: &[&'a str],
    ) -> Vec<&'a str> {
        let mut mismatched = Vec::new();
        for &field in text_fields {
            let bad = self.0.get(field).is_some_and(|value| {
                !matches!(value, Value::Null | Value::String(_) | Value::Number(_))
            });
            if bad {
                mismatched.push(field);
            }
        }
        for &field in number_fields {
            let bad = self
                .0
                .get(field)
                .is_some_and(|value| !value.is_null() && numeric_value(value).is_none());
            if bad {
                mismatched.push(field);
            }
        }
        mismatched
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, Value); N]> for RawRecord {
    fn from(fields: [(&str, Value); N]) -> Self {
        Self(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }
}

/// Field names used to read one kind of entity out of a raw record. Each slot
/// lists candidates in priority order.
#[derive(Debug, Clone, Copy)]
pub struct RecordShape {
    pub metric: &'static str,
    pub entity: &'static [&'static str],
    pub current: &'static [&'static str],
    pub previous: &'static [&'static str],
    pub rate: &'static [&'static str],
}

impl RecordShape {
    pub fn text_fields(&self) -> Vec<&'static str> {
        self.entity.to_vec()
    }

    pub fn number_fields(&self) -> Vec<&'static str> {
        self.current
            .iter()
            .chain(self.previous)
            .chain(self.rate)
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub entity: Option<String>,
    pub metric: String,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    /// Rate reported by the service; informational only.
    pub reported_rate: Option<f64>,
}

impl MetricRecord {
    pub fn new(entity: impl Into<String>, metric: impl Into<String>, current: Option<f64>) -> Self {
        Self {
            entity: Some(entity.into()),
            metric: metric.into(),
            current,
            previous: None,
            reported_rate: None,
        }
    }

    #[must_use]
    pub const fn with_previous(mut self, previous: Option<f64>) -> Self {
        self.previous = previous;
        self
    }

    #[must_use]
    pub const fn with_reported_rate(mut self, rate: Option<f64>) -> Self {
        self.reported_rate = rate;
        self
    }

    pub fn from_raw(raw: &RawRecord, shape: &RecordShape) -> Self {
        Self {
            entity: raw.first_text(shape.entity),
            metric: shape.metric.to_string(),
            current: raw.first_number(shape.current),
            previous: raw.first_number(shape.previous),
            reported_rate: raw.first_number(shape.rate),
        }
    }

    pub fn current_or_zero(&self) -> f64 {
        self.current.unwrap_or(0.0)
    }

    pub fn display_name(&self) -> &str {
        self.entity.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Weekly,
    Monthly,
}

impl Period {
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => f.write_str("weekly"),
            Self::Monthly => f.write_str("monthly"),
        }
    }
}

/// The widgets of one dashboard refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TopSalesVolume,
    TopSalesAmount,
    TopIncreased,
    TopDecreased,
    CountryDistribution,
    PlatformComparison,
    PlatformDetail,
    SalespersonComparison,
    PlatformSalesDistribution,
}

impl Widget {
    pub const ALL: [Self; 9] = [
        Self::TopSalesVolume,
        Self::TopSalesAmount,
        Self::TopIncreased,
        Self::TopDecreased,
        Self::CountryDistribution,
        Self::PlatformComparison,
        Self::PlatformDetail,
        Self::SalespersonComparison,
        Self::PlatformSalesDistribution,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::TopSalesVolume => "top_sales_volume",
            Self::TopSalesAmount => "top_sales_amount",
            Self::TopIncreased => "top_increased",
            Self::TopDecreased => "top_decreased",
            Self::CountryDistribution => "country_distribution",
            Self::PlatformComparison => "platform_comparison",
            Self::PlatformDetail => "platform_detail",
            Self::SalespersonComparison => "salesperson_comparison",
            Self::PlatformSalesDistribution => "platform_sales_distribution",
        }
    }

    pub const fn camel_key(self) -> &'static str {
        match self {
            Self::TopSalesVolume => "topSalesVolume",
            Self::TopSalesAmount => "topSalesAmount",
            Self::TopIncreased => "topIncreased",
            Self::TopDecreased => "topDecreased",
            Self::CountryDistribution => "countryDistribution",
            Self::PlatformComparison => "platformComparison",
            Self::PlatformDetail => "platformDetail",
            Self::SalespersonComparison => "salespersonComparison",
            Self::PlatformSalesDistribution => "platformSalesDistribution",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::TopSalesVolume => "Top Sales Volume",
            Self::TopSalesAmount => "Top Sales Amount",
            Self::TopIncreased => "Top Increased",
            Self::TopDecreased => "Top Decreased",
            Self::CountryDistribution => "Country Distribution",
            Self::PlatformComparison => "Platform Comparison",
            Self::PlatformDetail => "Platform Detail",
            Self::SalespersonComparison => "Salesperson Comparison",
            Self::PlatformSalesDistribution => "Platform Sales Distribution",
        }
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardPayload {
    pub period: Period,
    /// Compared window, e.g. `2024-W12` or `2024-03`.
    pub label: Option<String>,
    pub top_sales_volume: Vec<RawRecord>,
    pub top_sales_amount: Vec<RawRecord>,
    pub top_increased: Vec<RawRecord>,
    pub top_decreased: Vec<RawRecord>,
    pub country_distribution: Vec<RawRecord>,
    pub platform_comparison: RawRecord,
    pub platform_detail: Vec<RawRecord>,
    pub salesperson_comparison: Vec<RawRecord>,
    pub platform_sales_distribution: Vec<RawRecord>,
}

impl DashboardPayload {
    /// Builds a payload from any JSON value. Missing widgets are empty and a
    /// value that is not an object yields an empty dashboard.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            return Self::default();
        };

        let mut take = |widget: Widget| -> Value {
            root.remove(widget.key())
                .or_else(|| root.remove(widget.camel_key()))
                .unwrap_or(Value::Null)
        };

        let top_sales_volume = record_list(take(Widget::TopSalesVolume));
        let top_sales_amount = record_list(take(Widget::TopSalesAmount));
        let top_increased = record_list(take(Widget::TopIncreased));
        let top_decreased = record_list(take(Widget::TopDecreased));
        let country_distribution = record_list(take(Widget::CountryDistribution));
        let platform_comparison = match take(Widget::PlatformComparison) {
            Value::Array(mut items) if !items.is_empty() => RawRecord::from_value(items.remove(0)),
            other => RawRecord::from_value(other),
        };
        let platform_detail = record_list(take(Widget::PlatformDetail));
        let salesperson_comparison = record_list(take(Widget::SalespersonComparison));
        let platform_sales_distribution = keyed_records(
            take(Widget::PlatformSalesDistribution),
            "platform",
            "value",
        );

        let period = root
            .get("period")
            .and_then(Value::as_str)
            .and_then(Period::parse)
            .unwrap_or_default();
        let label = root
            .get("label")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(ToString::to_string);

        Self {
            period,
            label,
            top_sales_volume,
            top_sales_amount,
            top_increased,
            top_decreased,
            country_distribution,
            platform_comparison,
            platform_detail,
            salesperson_comparison,
            platform_sales_distribution,
        }
    }

    pub fn records(&self, widget: Widget) -> &[RawRecord] {
        match widget {
            Widget::TopSalesVolume => &self.top_sales_volume,
            Widget::TopSalesAmount => &self.top_sales_amount,
            Widget::TopIncreased => &self.top_increased,
            Widget::TopDecreased => &self.top_decreased,
            Widget::CountryDistribution => &self.country_distribution,
            Widget::PlatformComparison => std::slice::from_ref(&self.platform_comparison),
            Widget::PlatformDetail => &self.platform_detail,
            Widget::SalespersonComparison => &self.salesperson_comparison,
            Widget::PlatformSalesDistribution => &self.platform_sales_distribution,
        }
    }

    pub fn record_count(&self) -> usize {
        Widget::ALL
            .iter()
            .map(|&widget| {
                self.records(widget)
                    .iter()
                    .filter(|record| !record.is_empty())
                    .count()
            })
            .sum()
    }
}

pub fn parse_payload(bytes: &[u8]) -> Result<DashboardPayload> {
    let value: Value =
        serde_json::from_slice(bytes).context("failed to parse dashboard payload as JSON")?;
    Ok(DashboardPayload::from_value(value))
}

fn record_list(value: Value) -> Vec<RawRecord> {
    match value {
        Value::Array(items) => items.into_iter().map(RawRecord::from_value).collect(),
        Value::Object(map) if !map.is_empty() => vec![RawRecord(map)],
        _ => Vec::new(),
    }
}

/// Accepts either a list of records or an object mapping category to value.
fn keyed_records(value: Value, category_field: &str, value_field: &str) -> Vec<RawRecord> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(category, amount)| {
                RawRecord::from([(category_field, Value::String(category)), (value_field, amount)])
            })
            .collect(),
        other => record_list(other),
    }
}

fn last_payload_slot() -> &'static RwLock<Option<Arc<DashboardPayload>>> {
    static LAST_PAYLOAD: OnceLock<RwLock<Option<Arc<DashboardPayload>>>> = OnceLock::new();
    LAST_PAYLOAD.get_or_init(|| RwLock::new(None))
}

/// Keeps the latest successfully loaded payload so views can be re-rendered
/// without fetching again. Returns the stored snapshot.
pub fn remember_payload(payload: DashboardPayload) -> Arc<DashboardPayload> {
    let snapshot = Arc::new(payload);
    let mut slot = last_payload_slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = Some(Arc::clone(&snapshot));
    snapshot
}

pub fn last_payload() -> Option<Arc<DashboardPayload>> {
    last_payload_slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRODUCT: RecordShape = RecordShape {
        metric: "sales_amount",
        entity: &["product_name", "sku"],
        current: &["current_amount", "value"],
        previous: &["previous_amount"],
        rate: &["change_rate"],
    };

    #[test]
    fn test_raw_record_accessors_tolerate_bad_types() {
        let raw = RawRecord::from_value(json!({
            "product_name": "  Widget  ",
            "sku": 1042,
            "value": "300.5",
            "previous_amount": null,
            "change_rate": "n/a",
            "country": ["DE"],
        }));
        assert_eq!(raw.text("product_name").as_deref(), Some("Widget"));
        assert_eq!(raw.text("sku").as_deref(), Some("1042"));
        assert_eq!(raw.number("value"), Some(300.5));
        assert_eq!(raw.number("previous_amount"), None);
        assert_eq!(raw.number("change_rate"), None);
        assert_eq!(raw.text("country"), None);
        assert_eq!(
            raw.type_mismatches(&["country", "product_name"], &["change_rate", "previous_amount"]),
            vec!["country", "change_rate"]
        );
    }

    #[test]
    fn test_metric_record_from_raw_uses_field_priority() {
        let raw = RawRecord::from_value(json!({
            "sku": "SKU-9",
            "value": 10,
            "current_amount": 25,
            "change_rate": 25.0,
        }));
        let record = MetricRecord::from_raw(&raw, &PRODUCT);
        assert_eq!(record.entity.as_deref(), Some("SKU-9"));
        assert_eq!(record.current, Some(25.0));
        assert_eq!(record.previous, None);
        assert_eq!(record.reported_rate, Some(25.0));
        assert_eq!(record.metric, "sales_amount");
    }

    #[test]
    fn test_metric_record_display_name_falls_back() {
        let record = MetricRecord::from_raw(&RawRecord::from_value(json!(42)), &PRODUCT);
        assert_eq!(record.display_name(), "unknown");
        assert_eq!(record.current_or_zero(), 0.0);
    }

    #[test]
    fn test_payload_accepts_both_key_styles() {
        let payload = DashboardPayload::from_value(json!({
            "period": "Monthly",
            "label": "2024-03",
            "topSalesVolume": [{"product_name": "A", "value": 3}],
            "top_sales_amount": [{"product_name": "B", "value": 5}, "garbage"],
            "platformComparison": {"current_amount": 10},
            "platform_sales_distribution": {"Amazon": 600, "eBay": 400},
        }));
        assert_eq!(payload.period, Period::Monthly);
        assert_eq!(payload.label.as_deref(), Some("2024-03"));
        assert_eq!(payload.top_sales_volume.len(), 1);
        assert_eq!(payload.top_sales_amount.len(), 2);
        assert!(payload.top_sales_amount[1].is_empty());
        assert_eq!(payload.platform_comparison.number("current_amount"), Some(10.0));
        assert_eq!(payload.platform_sales_distribution.len(), 2);
        assert_eq!(
            payload.platform_sales_distribution[0].text("platform").as_deref(),
            Some("Amazon")
        );
        assert!(payload.top_decreased.is_empty());
        assert_eq!(payload.record_count(), 5);
    }

    #[test]
    fn test_payload_from_non_object_is_empty() {
        assert_eq!(DashboardPayload::from_value(json!([1, 2])), DashboardPayload::default());
        assert!(parse_payload(b"{not json").is_err());
        let payload = parse_payload(b"null").unwrap();
        assert_eq!(payload.record_count(), 0);
    }

    #[test]
    fn test_last_payload_store_keeps_latest_snapshot() {
        let first = DashboardPayload {
            label: Some("2024-W01".to_string()),
            ..DashboardPayload::default()
        };
        let second = DashboardPayload {
            label: Some("2024-W02".to_string()),
            ..DashboardPayload::default()
        };
        let earlier = remember_payload(first);
        let stored = remember_payload(second);
        // Other tests share the store, so only the returned snapshots are stable.
        assert_eq!(earlier.label.as_deref(), Some("2024-W01"));
        assert_eq!(stored.label.as_deref(), Some("2024-W02"));
        assert!(!Arc::ptr_eq(&earlier, &stored));
        assert!(last_payload().is_some());
    }
}
