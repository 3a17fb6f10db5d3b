use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<T> {
    pub entity: T,
    /// The selected metric as supplied; `None` when it was missing.
    pub metric_value: Option<f64>,
    pub rank: usize,
}

/// Selects the first `n` records ordered by `metric`.
///
/// The sort is stable, so records with equal metric values keep their input
/// order. Missing (or NaN) metric values rank as `0.0` but stay `None` in the
/// returned entries. Ranks are dense, starting at 1.
pub fn top_n<T, F>(records: &[T], metric: F, n: usize, order: RankOrder) -> Vec<RankedEntry<&T>>
where
    F: Fn(&T) -> Option<f64>,
{
    let mut scored: Vec<(usize, Option<f64>)> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (idx, metric(record).filter(|value| !value.is_nan())))
        .collect();

    scored.sort_by(|(_, value_a), (_, value_b)| {
        let ord = value_a
            .unwrap_or(0.0)
            .partial_cmp(&value_b.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal);
        match order {
            RankOrder::Descending => ord.reverse(),
            RankOrder::Ascending => ord,
        }
    });

    scored
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(position, (idx, metric_value))| RankedEntry {
            entity: &records[idx],
            metric_value,
            rank: position + 1,
        })
        .collect()
}
