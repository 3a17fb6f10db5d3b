//! View-model assembly.
//!
//! Ranked lists, distributions and hand-built multi-metric tables are all
//! normalised into a [`MetricTable`] first; [`assemble`] then shapes that
//! table into a chart or table [`ViewModel`]. Assembly never fails: missing
//! numbers stay `None` in the series and render as `N/A`, missing labels
//! render as `unknown`, and an empty table yields the empty view model.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::distribution::{Distribution, distribution};
use crate::formatting::{self, FormatMode, FormatStyle, UNKNOWN_LABEL};
use crate::options::AssembleOptions;
use crate::payload::MetricRecord;
use crate::ranking::RankedEntry;

const RADAR_HEADROOM: f64 = 1.2;
const SHARE_SERIES_NAME: &str = "Share";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Radar,
    Table,
}

impl ChartKind {
    pub const ALL: [Self; 4] = [Self::Bar, Self::Pie, Self::Radar, Self::Table];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Radar => "radar",
            Self::Table => "table",
        }
    }
}

/// One metric column of a [`MetricTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub mode: FormatMode,
    /// Radar only: negative values are drawn as zero.
    #[serde(default)]
    pub clamp_negative: bool,
    /// Radar only: lower bound for the axis maximum.
    #[serde(default)]
    pub axis_floor: f64,
    /// Radar only: the axis maximum is the column peak times this factor.
    #[serde(default = "default_headroom")]
    pub headroom: f64,
}

const fn default_headroom() -> f64 {
    RADAR_HEADROOM
}

impl Column {
    pub fn new(name: impl Into<String>, mode: FormatMode) -> Self {
        Self {
            name: name.into(),
            mode,
            clamp_negative: false,
            axis_floor: 0.0,
            headroom: RADAR_HEADROOM,
        }
    }

    #[must_use]
    pub const fn clamped(mut self) -> Self {
        self.clamp_negative = true;
        self
    }

    #[must_use]
    pub const fn with_axis_floor(mut self, floor: f64) -> Self {
        self.axis_floor = floor;
        self
    }

    #[must_use]
    pub const fn with_headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom;
        self
    }

    fn radar_value(&self, value: f64) -> f64 {
        if self.clamp_negative { value.max(0.0) } else { value }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableRow {
    pub label: Option<String>,
    pub values: Vec<Option<f64>>,
    /// Presentation share when the row comes from a distribution.
    pub share: Option<f64>,
}

impl TableRow {
    fn full_label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNKNOWN_LABEL)
    }

    fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricTable {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

/// Anything that can name a row.
pub trait Labelled {
    fn label(&self) -> Option<&str>;
}

impl Labelled for MetricRecord {
    fn label(&self) -> Option<&str> {
        self.entity.as_deref()
    }
}

impl Labelled for String {
    fn label(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Labelled for str {
    fn label(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: Labelled + ?Sized> Labelled for &T {
    fn label(&self) -> Option<&str> {
        (**self).label()
    }
}

impl MetricTable {
    pub const fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or cutting `values` to the column count and
    /// dropping non-finite numbers.
    pub fn push_row(&mut self, label: Option<String>, mut values: Vec<Option<f64>>) {
        values.resize(self.columns.len(), None);
        let values = values
            .into_iter()
            .map(|value| value.filter(|v| v.is_finite()))
            .collect();
        self.rows.push(TableRow {
            label,
            values,
            share: None,
        });
    }

    pub fn from_ranked<T: Labelled>(entries: &[RankedEntry<T>], column: Column) -> Self {
        let mut table = Self::new(vec![column]);
        for entry in entries {
            table.push_row(
                entry.entity.label().map(ToString::to_string),
                vec![entry.metric_value],
            );
        }
        table
    }

    pub fn from_distribution(dist: &Distribution, column: Column) -> Self {
        let mut table = Self::new(vec![column]);
        for slice in &dist.slices {
            table.push_row(Some(slice.category.clone()), vec![Some(slice.value)]);
            if let Some(row) = table.rows.last_mut() {
                row.share = Some(slice.share_percent);
            }
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub name: String,
    pub max: f64,
}

/// Rendering-agnostic payload for one chart or table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewModel {
    pub labels: Vec<String>,
    /// Each series has exactly one entry per label.
    pub series: Vec<Vec<Option<f64>>>,
    pub tooltip: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub axes: Vec<RadarAxis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
}

impl ViewModel {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn tooltip_for(&self, label: &str) -> Option<&str> {
        self.tooltip.get(label).map(String::as_str)
    }
}

pub fn assemble(kind: ChartKind, table: &MetricTable, options: &AssembleOptions) -> ViewModel {
    if table.is_empty() {
        return ViewModel::default();
    }
    // Pie slices must cover the whole distribution to add up to 100%.
    let rows = match kind {
        ChartKind::Pie => table.rows.as_slice(),
        _ => &table.rows[..table.rows.len().min(options.row_limit())],
    };

    match kind {
        ChartKind::Bar => assemble_bar(&table.columns, rows, options),
        ChartKind::Pie => assemble_pie(&table.columns, rows, options),
        ChartKind::Radar => assemble_radar(&table.columns, rows, options),
        ChartKind::Table => assemble_table(&table.columns, rows, options),
    }
}

fn assemble_bar(columns: &[Column], rows: &[TableRow], options: &AssembleOptions) -> ViewModel {
    let mut view = labelled_view(columns, rows, options, true);
    view.series = column_series(columns, rows, |_, value| value);
    if let Some(first) = columns.first() {
        view.value_labels = rows
            .iter()
            .map(|row| format_cell(row.value(0), first, options, FormatStyle::Compact))
            .collect();
    }
    view
}

fn assemble_pie(columns: &[Column], rows: &[TableRow], options: &AssembleOptions) -> ViewModel {
    let Some(column) = columns.first() else {
        return ViewModel::default();
    };

    let values: Vec<Option<f64>> = rows.iter().map(|row| row.value(0)).collect();
    let shares: Vec<f64> = if rows.iter().all(|row| row.share.is_some()) {
        rows.iter().map(|row| row.share.unwrap_or(0.0)).collect()
    } else {
        let keyed: Vec<(usize, Option<f64>)> = values.iter().copied().enumerate().collect();
        distribution(&keyed, |(idx, _)| Some(idx.to_string()), |(_, value)| *value)
            .slices
            .iter()
            .map(|slice| slice.share_percent)
            .collect()
    };

    let mut view = ViewModel::default();
    for (idx, (row, share)) in rows.iter().zip(&shares).enumerate() {
        let label = formatting::truncate_label(row.full_label(), options.label_max_length);
        let text = format!(
            "{}: {} ({})",
            row.full_label(),
            format_cell(row.value(0), column, options, FormatStyle::Full),
            formatting::format_share(Some(*share))
        );
        insert_tooltip(&mut view.tooltip, &label, text);
        if let Some(color) = options.color_for(idx) {
            view.colors.push(color.to_string());
        }
        view.value_labels
            .push(format_cell(row.value(0), column, options, FormatStyle::Compact));
        view.labels.push(label);
    }
    view.series = vec![values, shares.into_iter().map(Some).collect()];
    view.series_names = vec![column.name.clone(), SHARE_SERIES_NAME.to_string()];
    view
}

fn assemble_radar(columns: &[Column], rows: &[TableRow], options: &AssembleOptions) -> ViewModel {
    let mut view = labelled_view(columns, rows, options, true);

    let mut matrix = Array2::<f64>::zeros((rows.len(), columns.len()));
    for ((row_idx, col_idx), cell) in matrix.indexed_iter_mut() {
        let value = rows[row_idx].value(col_idx).unwrap_or(0.0);
        *cell = columns[col_idx].radar_value(value);
    }

    view.axes = columns
        .iter()
        .enumerate()
        .map(|(col_idx, column)| {
            let peak = matrix
                .column(col_idx)
                .fold(f64::NEG_INFINITY, |acc, &value| acc.max(value));
            let max = (peak * column.headroom).max(column.axis_floor);
            RadarAxis {
                name: column.name.clone(),
                max: if max > 0.0 { max } else { 1.0 },
            }
        })
        .collect();
    view.series = column_series(columns, rows, |column, value| {
        value.map(|v| column.radar_value(v))
    });
    view
}

fn assemble_table(columns: &[Column], rows: &[TableRow], options: &AssembleOptions) -> ViewModel {
    let mut view = labelled_view(columns, rows, options, false);
    view.colors.clear();
    view.series = column_series(columns, rows, |_, value| value);

    let with_share = rows.iter().any(|row| row.share.is_some());
    if with_share {
        view.series.push(rows.iter().map(|row| row.share).collect());
        view.series_names.push(SHARE_SERIES_NAME.to_string());
    }

    view.rows = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(columns.len() + 2);
            cells.push(row.full_label().to_string());
            for (idx, column) in columns.iter().enumerate() {
                cells.push(format_cell(row.value(idx), column, options, FormatStyle::Full));
            }
            if with_share {
                cells.push(formatting::format_share(row.share));
            }
            cells
        })
        .collect();
    view
}

/// Labels, tooltips, colours and series names shared by every non-pie shape.
fn labelled_view(
    columns: &[Column],
    rows: &[TableRow],
    options: &AssembleOptions,
    truncate: bool,
) -> ViewModel {
    let mut view = ViewModel::default();
    for (idx, row) in rows.iter().enumerate() {
        let label = if truncate {
            formatting::truncate_label(row.full_label(), options.label_max_length)
        } else {
            row.full_label().to_string()
        };
        insert_tooltip(&mut view.tooltip, &label, describe_row(row, columns, options));
        if let Some(color) = options.color_for(idx) {
            view.colors.push(color.to_string());
        }
        view.labels.push(label);
    }
    view.series_names = columns.iter().map(|column| column.name.clone()).collect();
    view
}

fn column_series<F>(columns: &[Column], rows: &[TableRow], transform: F) -> Vec<Vec<Option<f64>>>
where
    F: Fn(&Column, Option<f64>) -> Option<f64>,
{
    columns
        .iter()
        .enumerate()
        .map(|(col_idx, column)| {
            rows.iter()
                .map(|row| transform(column, row.value(col_idx)))
                .collect()
        })
        .collect()
}

fn format_cell(
    value: Option<f64>,
    column: &Column,
    options: &AssembleOptions,
    style: FormatStyle,
) -> String {
    formatting::format_styled(value, options.resolve_mode(column.mode), style)
}

fn describe_row(row: &TableRow, columns: &[Column], options: &AssembleOptions) -> String {
    let mut text = row.full_label().to_string();
    for (idx, column) in columns.iter().enumerate() {
        text.push('\n');
        text.push_str(&column.name);
        text.push_str(": ");
        text.push_str(&format_cell(row.value(idx), column, options, FormatStyle::Full));
    }
    if let Some(share) = row.share {
        text.push('\n');
        text.push_str(SHARE_SERIES_NAME);
        text.push_str(": ");
        text.push_str(&formatting::format_share(Some(share)));
    }
    text
}

/// Truncation can map two rows onto one label; their tooltip texts are then
/// kept together under that label.
fn insert_tooltip(tooltip: &mut BTreeMap<String, String>, label: &str, text: String) {
    match tooltip.entry(label.to_string()) {
        Entry::Occupied(mut existing) => {
            let existing = existing.get_mut();
            existing.push('\n');
            existing.push_str(&text);
        }
        Entry::Vacant(slot) => {
            slot.insert(text);
        }
    }
}
