use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::formatting::UNKNOWN_LABEL;

/// Shares are presented in tenths of a percent.
const SHARE_UNITS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub category: String,
    pub value: f64,
    /// Presentation share, one decimal, summing to 100 across slices.
    pub share_percent: f64,
    /// Unrounded share used for any further computation.
    pub raw_share: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Distribution {
    pub slices: Vec<DistributionSlice>,
    pub total: f64,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Groups records by category (first-seen order, duplicate categories summed)
/// and computes each category's share of the total.
pub fn distribution<T, C, V>(records: &[T], category: C, value: V) -> Distribution
where
    C: Fn(&T) -> Option<String>,
    V: Fn(&T) -> Option<f64>,
{
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<(String, f64)> = Vec::new();

    for record in records {
        let name = category(record).unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let amount = value(record).filter(|v| v.is_finite()).unwrap_or(0.0);
        if let Some(&idx) = index.get(name.as_str()) {
            groups[idx].1 += amount;
        } else {
            index.insert(name.clone(), groups.len());
            groups.push((name, amount));
        }
    }

    let total: f64 = groups.iter().map(|(_, amount)| amount).sum();
    let raw_shares: Vec<f64> = if total == 0.0 || !total.is_finite() {
        vec![0.0; groups.len()]
    } else {
        groups
            .iter()
            .map(|(_, amount)| amount / total * 100.0)
            .collect()
    };
    let presented = if total == 0.0 || !total.is_finite() {
        vec![0.0; groups.len()]
    } else {
        round_shares(&raw_shares)
    };

    let slices = groups
        .into_iter()
        .zip(raw_shares)
        .zip(presented)
        .map(|(((category, value), raw_share), share_percent)| DistributionSlice {
            category,
            value,
            share_percent,
            raw_share,
        })
        .collect();

    Distribution { slices, total }
}

/// Largest-remainder rounding to one decimal so the rounded shares add up to
/// exactly 100.0. Ties go to the earlier slice.
fn round_shares(raw_shares: &[f64]) -> Vec<f64> {
    let scaled: Vec<f64> = raw_shares
        .iter()
        .map(|share| share * SHARE_UNITS / 100.0)
        .collect();
    let mut units: Vec<f64> = scaled.iter().map(|value| value.floor()).collect();

    let assigned: f64 = units.iter().sum();
    let missing = (SHARE_UNITS - assigned).round().clamp(0.0, raw_shares.len() as f64);

    let mut by_remainder: Vec<usize> = (0..scaled.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let rem_a = scaled[a] - units[a];
        let rem_b = scaled[b] - units[b];
        rem_b.total_cmp(&rem_a)
    });

    let mut remaining = missing;
    for idx in by_remainder {
        if remaining < 1.0 {
            break;
        }
        units[idx] += 1.0;
        remaining -= 1.0;
    }

    units.into_iter().map(|unit| unit / 10.0).collect()
}
