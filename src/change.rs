//! Period-over-period change computation.
//!
//! This module is the single authoritative path for percentage changes. A
//! rate supplied by the analytics service is only ever cross-checked against
//! it or, when the previous value is missing, used to reconstruct that value.

use serde::{Deserialize, Serialize};

use crate::payload::MetricRecord;

/// Allowed gap, in percentage points, between a computed rate and one
/// reported by the service (which rounds to two decimals).
pub const RATE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Up
        } else if value < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    pub absolute_delta: f64,
    /// `None` when the previous value is zero or absent.
    pub percent_change: Option<f64>,
    pub direction: Direction,
}

impl ChangeResult {
    pub const fn is_computable(&self) -> bool {
        self.percent_change.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum ImpliedPrevious {
    Known(f64),
    Indeterminate,
}

impl ImpliedPrevious {
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Known(value) => Some(value),
            Self::Indeterminate => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RateCheck {
    Agrees,
    Diverges { computed: f64, reported: f64 },
    Unverifiable,
}

pub fn compute_change(current: f64, previous: Option<f64>) -> ChangeResult {
    let base = previous.filter(|value| value.is_finite()).unwrap_or(0.0);
    let current = if current.is_finite() { current } else { 0.0 };
    let absolute_delta = saturate(current - base);

    // Near the edge of the f64 range the ratio itself can overflow.
    let percent_change = Some(base)
        .filter(|base| *base != 0.0)
        .map(|base| (current - base) / base * 100.0)
        .filter(|rate| rate.is_finite());

    ChangeResult {
        absolute_delta,
        percent_change,
        direction: Direction::of(percent_change.unwrap_or(absolute_delta)),
    }
}

/// Finite inputs can still overflow a subtraction; clamp to the largest finite value.
fn saturate(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX.copysign(value)
    }
}

/// Reconstructs the previous value from a known current value and rate.
pub fn implied_previous(current: f64, percent_change: f64) -> ImpliedPrevious {
    if !current.is_finite() || !percent_change.is_finite() {
        return ImpliedPrevious::Indeterminate;
    }
    let factor = 1.0 + percent_change / 100.0;
    if factor == 0.0 {
        return if current == 0.0 {
            ImpliedPrevious::Known(0.0)
        } else {
            ImpliedPrevious::Indeterminate
        };
    }
    ImpliedPrevious::Known(current / factor)
}

pub fn cross_check(change: &ChangeResult, reported_rate: Option<f64>) -> RateCheck {
    match (change.percent_change, reported_rate.filter(|r| r.is_finite())) {
        (Some(computed), Some(reported)) => {
            if (computed - reported).abs() <= RATE_TOLERANCE {
                RateCheck::Agrees
            } else {
                RateCheck::Diverges { computed, reported }
            }
        }
        _ => RateCheck::Unverifiable,
    }
}

/// Previous value for a record: the reported one when present, otherwise the
/// one implied by the service-reported rate.
pub fn effective_previous(record: &MetricRecord) -> Option<f64> {
    if record.previous.is_some() {
        return record.previous;
    }
    let rate = record.reported_rate?;
    implied_previous(record.current_or_zero(), rate).value()
}

pub fn resolve_change(record: &MetricRecord) -> ChangeResult {
    compute_change(record.current_or_zero(), effective_previous(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(current: Option<f64>, previous: Option<f64>, rate: Option<f64>) -> MetricRecord {
        MetricRecord {
            entity: Some("P-1".to_string()),
            metric: "sales_amount".to_string(),
            current,
            previous,
            reported_rate: rate,
        }
    }

    #[test]
    fn test_compute_change_growth() {
        let change = compute_change(120.0, Some(100.0));
        assert_eq!(change.percent_change, Some(20.0));
        assert_eq!(change.absolute_delta, 20.0);
        assert_eq!(change.direction, Direction::Up);
    }

    #[test]
    fn test_compute_change_zero_base_is_not_computable() {
        let change = compute_change(80.0, Some(0.0));
        assert_eq!(change.percent_change, None);
        assert_eq!(change.absolute_delta, 80.0);
        assert_eq!(change.direction, Direction::Up);

        let missing = compute_change(-5.0, None);
        assert!(!missing.is_computable());
        assert_eq!(missing.direction, Direction::Down);

        let flat = compute_change(0.0, None);
        assert_eq!(flat.direction, Direction::Flat);
    }

    #[test]
    fn test_compute_change_negative_base() {
        let change = compute_change(-50.0, Some(-100.0));
        assert_eq!(change.percent_change, Some(-50.0));
        assert_eq!(change.direction, Direction::Down);
        assert_eq!(change.absolute_delta, 50.0);
    }

    #[test]
    fn test_compute_change_never_overflows() {
        let huge = compute_change(1e308, Some(1e-300));
        assert_eq!(huge.percent_change, None);
        assert!(huge.absolute_delta.is_finite());
        assert_eq!(huge.direction, Direction::Up);

        let wide = compute_change(-1.5e308, Some(1.5e308));
        assert_eq!(wide.absolute_delta, -f64::MAX);
        assert_eq!(wide.percent_change, None);
        assert_eq!(wide.direction, Direction::Down);
    }

    #[test]
    fn test_compute_change_flat_only_on_exact_zero() {
        let change = compute_change(100.0, Some(100.0));
        assert_eq!(change.percent_change, Some(0.0));
        assert_eq!(change.direction, Direction::Flat);
    }

    #[test]
    fn test_implied_previous() {
        let previous = implied_previous(120.0, 20.0).value().unwrap();
        assert!((previous - 100.0).abs() < 1e-9);
        assert_eq!(implied_previous(50.0, 0.0), ImpliedPrevious::Known(50.0));
        assert_eq!(implied_previous(0.0, -100.0), ImpliedPrevious::Known(0.0));
        assert_eq!(implied_previous(10.0, -100.0), ImpliedPrevious::Indeterminate);
        assert_eq!(implied_previous(10.0, f64::NAN), ImpliedPrevious::Indeterminate);
    }

    #[test]
    fn test_cross_check() {
        let change = compute_change(3.0, Some(7.0));
        let computed = change.percent_change.unwrap();
        assert_eq!(cross_check(&change, Some(-57.14)), RateCheck::Agrees);
        assert_eq!(
            cross_check(&change, Some(12.0)),
            RateCheck::Diverges {
                computed,
                reported: 12.0
            }
        );
        assert_eq!(cross_check(&change, None), RateCheck::Unverifiable);
        assert_eq!(
            cross_check(&compute_change(3.0, None), Some(0.0)),
            RateCheck::Unverifiable
        );
    }

    #[test]
    fn test_resolve_change_prefers_previous_value() {
        let change = resolve_change(&record(Some(150.0), Some(100.0), Some(99.0)));
        assert_eq!(change.percent_change, Some(50.0));
    }

    #[test]
    fn test_resolve_change_reconstructs_previous_from_rate() {
        let rec = record(Some(120.0), None, Some(20.0));
        let previous = effective_previous(&rec).unwrap();
        assert!((previous - 100.0).abs() < 1e-9);
        let change = resolve_change(&rec);
        assert!((change.percent_change.unwrap() - 20.0).abs() < 1e-9);
        assert!((change.absolute_delta - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_change_without_comparison_data() {
        let change = resolve_change(&record(None, None, None));
        assert_eq!(change.percent_change, None);
        assert_eq!(change.absolute_delta, 0.0);
        assert_eq!(change.direction, Direction::Flat);

        let indeterminate = resolve_change(&record(Some(10.0), None, Some(-100.0)));
        assert_eq!(indeterminate.percent_change, None);
        assert_eq!(indeterminate.absolute_delta, 10.0);
    }
}
