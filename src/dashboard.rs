//! Wires every widget of a weekly/monthly dashboard through the core.
//!
//! Malformed records are degraded, never rejected: each one is logged with
//! its widget and index and then compiled with sentinel values.

use serde::Serialize;
use tracing::{debug, warn};

use crate::change::{
    ChangeResult, RateCheck, compute_change, cross_check, effective_previous, resolve_change,
};
use crate::distribution::distribution;
use crate::formatting::FormatMode;
use crate::options::AssembleOptions;
use crate::payload::{
    DashboardPayload, MetricRecord, Period, RawRecord, RecordShape, Widget, last_payload,
};
use crate::ranking::{RankOrder, top_n};
use crate::viewmodel::{ChartKind, Column, MetricTable, ViewModel, assemble};

/// Change-rate radar axes never shrink below this bound.
const RATE_AXIS_FLOOR: f64 = 100.0;
const PROFIT_AXIS_FLOOR: f64 = 20.0;
const GROWTH_AXIS_FLOOR: f64 = 20.0;
const PLATFORM_TOTAL_LABEL: &str = "All platforms";

const PRODUCT_VOLUME: RecordShape = RecordShape {
    metric: "sales_volume",
    entity: &["product_name", "sku"],
    current: &["value", "sales_volume"],
    previous: &[],
    rate: &[],
};

const PRODUCT_AMOUNT: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["product_name", "sku"],
    current: &["value", "sales_amount", "current_amount"],
    previous: &[],
    rate: &[],
};

const PRODUCT_CHANGE: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["product_name", "sku"],
    current: &["current_value", "current_amount", "value"],
    previous: &["previous_value", "previous_amount"],
    rate: &["change_rate"],
};

const COUNTRY: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["country", "buyer_country"],
    current: &["value", "current_amount"],
    previous: &["previous_value", "previous_amount"],
    rate: &["change_rate"],
};

const PLATFORM_DETAIL: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["platform"],
    current: &["sales_amount", "current_amount", "value"],
    previous: &["previous_amount"],
    rate: &["change_rate", "amount_change_rate"],
};

const PLATFORM_SHARE: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["platform"],
    current: &["value", "sales_amount"],
    previous: &[],
    rate: &[],
};

const SALESPERSON: RecordShape = RecordShape {
    metric: "sales_amount",
    entity: &["sales_person"],
    current: &["current_amount", "sales_amount"],
    previous: &["previous_amount"],
    rate: &["amount_change_rate", "change_rate"],
};

const SALESPERSON_EXTRA_NUMBERS: [&str; 7] = [
    "current_volume",
    "previous_volume",
    "sales_volume",
    "current_orders",
    "previous_orders",
    "order_count",
    "average_order",
];

const PLATFORM_TOTALS: [(&str, &str, &str, &str); 3] = [
    ("Sales amount", "current_amount", "previous_amount", "amount_change_rate"),
    ("Sales volume", "current_volume", "previous_volume", "volume_change_rate"),
    ("Orders", "current_orders", "previous_orders", "orders_change_rate"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedView {
    pub widget: Widget,
    pub kind: ChartKind,
    pub view: ViewModel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub period: Period,
    pub label: Option<String>,
    pub views: Vec<NamedView>,
    /// Records that held a wrong-typed field or were not objects at all.
    pub degraded_records: usize,
    /// Service-reported rates that disagreed with the computed ones.
    pub rate_divergences: usize,
}

impl DashboardViews {
    pub fn view(&self, widget: Widget, kind: ChartKind) -> Option<&ViewModel> {
        self.views
            .iter()
            .find(|named| named.widget == widget && named.kind == kind)
            .map(|named| &named.view)
    }

    pub fn tables(&self) -> impl Iterator<Item = &NamedView> {
        self.views
            .iter()
            .filter(|named| named.kind == ChartKind::Table)
    }
}

/// Compiles every widget view of one dashboard refresh.
pub fn compile_dashboard(payload: &DashboardPayload, options: &AssembleOptions) -> DashboardViews {
    let mut compiler = Compiler {
        options,
        views: Vec::new(),
        degraded_records: 0,
        rate_divergences: 0,
    };

    compiler.top_products(payload, Widget::TopSalesVolume, &PRODUCT_VOLUME, FormatMode::Plain);
    compiler.top_products(payload, Widget::TopSalesAmount, &PRODUCT_AMOUNT, FormatMode::Currency);
    compiler.product_changes(payload, Widget::TopIncreased, RankOrder::Descending);
    compiler.product_changes(payload, Widget::TopDecreased, RankOrder::Ascending);
    compiler.country_distribution(payload);
    compiler.platform_comparison(payload);
    compiler.platform_detail(payload);
    compiler.salesperson_comparison(payload);
    compiler.platform_sales_distribution(payload);

    debug!(
        views = compiler.views.len(),
        degraded = compiler.degraded_records,
        divergences = compiler.rate_divergences,
        "compiled dashboard"
    );

    DashboardViews {
        period: payload.period,
        label: payload.label.clone(),
        views: compiler.views,
        degraded_records: compiler.degraded_records,
        rate_divergences: compiler.rate_divergences,
    }
}

/// Re-renders the last loaded payload, if any, without fetching again.
pub fn compile_latest(options: &AssembleOptions) -> Option<DashboardViews> {
    last_payload().map(|payload| compile_dashboard(&payload, options))
}

struct Compared {
    record: MetricRecord,
    change: ChangeResult,
}

struct Compiler<'a> {
    options: &'a AssembleOptions,
    views: Vec<NamedView>,
    degraded_records: usize,
    rate_divergences: usize,
}

impl Compiler<'_> {
    fn push(&mut self, widget: Widget, kind: ChartKind, table: &MetricTable) {
        self.views.push(NamedView {
            widget,
            kind,
            view: assemble(kind, table, self.options),
        });
    }

    /// Reads one widget's records, logging the malformed ones.
    fn records(
        &mut self,
        widget: Widget,
        raw: &[RawRecord],
        shape: &RecordShape,
        extra_numbers: &[&str],
    ) -> Vec<MetricRecord> {
        let text_fields = shape.text_fields();
        let mut number_fields: Vec<&str> = shape.number_fields();
        number_fields.extend_from_slice(extra_numbers);
        raw.iter()
            .enumerate()
            .map(|(idx, record)| {
                self.inspect(widget, idx, record, &text_fields, &number_fields);
                MetricRecord::from_raw(record, shape)
            })
            .collect()
    }

    fn inspect(
        &mut self,
        widget: Widget,
        idx: usize,
        record: &RawRecord,
        text_fields: &[&str],
        number_fields: &[&str],
    ) {
        if record.is_empty() {
            self.degraded_records += 1;
            warn!(widget = %widget, index = idx, "record is empty or not an object");
            return;
        }
        let mismatched = record.type_mismatches(text_fields, number_fields);
        if !mismatched.is_empty() {
            self.degraded_records += 1;
            warn!(
                widget = %widget,
                index = idx,
                fields = ?mismatched,
                "record has malformed fields, using sentinels"
            );
        }
    }

    fn checked_change(&mut self, widget: Widget, idx: usize, record: &MetricRecord) -> ChangeResult {
        let change = resolve_change(record);
        self.note_rate_check(widget, idx, record.metric.as_str(), &change, record.reported_rate);
        change
    }

    fn note_rate_check(
        &mut self,
        widget: Widget,
        idx: usize,
        metric: &str,
        change: &ChangeResult,
        reported: Option<f64>,
    ) {
        if let RateCheck::Diverges { computed, reported } = cross_check(change, reported) {
            self.rate_divergences += 1;
            warn!(
                widget = %widget,
                index = idx,
                metric,
                computed,
                reported,
                "reported change rate disagrees with computed rate"
            );
        }
    }

    fn compare_all(&mut self, widget: Widget, records: Vec<MetricRecord>) -> Vec<Compared> {
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                let change = self.checked_change(widget, idx, &record);
                Compared { record, change }
            })
            .collect()
    }

    fn top_products(
        &mut self,
        payload: &DashboardPayload,
        widget: Widget,
        shape: &RecordShape,
        mode: FormatMode,
    ) {
        let records = self.records(widget, payload.records(widget), shape, &[]);
        let ranked = top_n(
            &records,
            |record| record.current,
            self.options.row_limit(),
            RankOrder::Descending,
        );
        let column_name = match mode {
            FormatMode::Currency => "Sales amount",
            _ => "Sales volume",
        };
        let table = MetricTable::from_ranked(&ranked, Column::new(column_name, mode));
        self.push(widget, ChartKind::Bar, &table);
        self.push(widget, ChartKind::Table, &table);
    }

    fn product_changes(&mut self, payload: &DashboardPayload, widget: Widget, order: RankOrder) {
        let records = self.records(widget, payload.records(widget), &PRODUCT_CHANGE, &[]);
        let compared = self.compare_all(widget, records);
        // Ranked by money moved; the rate is only displayed.
        let ranked = top_n(
            &compared,
            |item| Some(item.change.absolute_delta),
            self.options.row_limit(),
            order,
        );

        let mut table = MetricTable::new(vec![
            Column::new("Change", FormatMode::Percent),
            Column::new("Current", FormatMode::Currency),
            Column::new("Previous", FormatMode::Currency),
        ]);
        for entry in &ranked {
            let item = entry.entity;
            table.push_row(
                item.record.entity.clone(),
                vec![
                    item.change.percent_change,
                    item.record.current,
                    effective_previous(&item.record),
                ],
            );
        }
        self.push(widget, ChartKind::Bar, &table);
        self.push(widget, ChartKind::Table, &table);
    }

    fn country_distribution(&mut self, payload: &DashboardPayload) {
        let widget = Widget::CountryDistribution;
        let records = self.records(widget, payload.records(widget), &COUNTRY, &["percent"]);
        let dist = distribution(&records, |r| r.entity.clone(), |r| r.current);
        let shares = MetricTable::from_distribution(&dist, Column::new("Sales", FormatMode::Currency));
        self.push(widget, ChartKind::Pie, &shares);
        self.push(widget, ChartKind::Table, &shares);

        let compared = self.compare_all(widget, records);
        let ranked = top_n(
            &compared,
            |item| Some(item.change.absolute_delta),
            self.options.row_limit(),
            RankOrder::Descending,
        );
        let mut growth = MetricTable::new(vec![
            Column::new("Change", FormatMode::Percent),
            Column::new("Current", FormatMode::Currency),
            Column::new("Previous", FormatMode::Currency),
        ]);
        for entry in &ranked {
            let item = entry.entity;
            growth.push_row(
                item.record.entity.clone(),
                vec![
                    item.change.percent_change,
                    item.record.current,
                    effective_previous(&item.record),
                ],
            );
        }
        self.push(widget, ChartKind::Bar, &growth);
    }

    fn platform_comparison(&mut self, payload: &DashboardPayload) {
        let widget = Widget::PlatformComparison;
        let raw = &payload.platform_comparison;
        if raw.is_empty() {
            let empty = MetricTable::default();
            self.push(widget, ChartKind::Radar, &empty);
            self.push(widget, ChartKind::Table, &empty);
            return;
        }

        let number_fields: Vec<&str> = PLATFORM_TOTALS
            .iter()
            .flat_map(|(_, current, previous, rate)| [*current, *previous, *rate])
            .chain([
                "current_profit_rate",
                "previous_profit_rate",
                "profit_rate_change",
            ])
            .collect();
        self.inspect(widget, 0, raw, &[], &number_fields);

        let mut radar_columns = Vec::new();
        let mut radar_values = Vec::new();
        let mut table_columns = Vec::new();
        let mut table_values = Vec::new();

        for (name, current_field, previous_field, rate_field) in PLATFORM_TOTALS {
            let record = MetricRecord {
                entity: Some(PLATFORM_TOTAL_LABEL.to_string()),
                metric: current_field.to_string(),
                current: raw.number(current_field),
                previous: raw.number(previous_field),
                reported_rate: raw.number(rate_field),
            };
            let change = self.checked_change(widget, 0, &record);
            let mode = if current_field == "current_amount" {
                FormatMode::Currency
            } else {
                FormatMode::Plain
            };

            radar_columns.push(
                Column::new(format!("{name} change"), FormatMode::Percent)
                    .with_axis_floor(RATE_AXIS_FLOOR),
            );
            radar_values.push(change.percent_change);

            table_columns.push(Column::new(name, mode));
            table_columns.push(Column::new(format!("Previous {}", name.to_lowercase()), mode));
            table_columns.push(Column::new(format!("{name} change"), FormatMode::Percent));
            table_values.extend([
                record.current,
                effective_previous(&record),
                change.percent_change,
            ]);
        }

        let current_profit = raw.number("current_profit_rate");
        let previous_profit = raw.number("previous_profit_rate");
        let profit_change = profit_rate_change(current_profit, previous_profit)
            .or_else(|| raw.number("profit_rate_change"));

        radar_columns.push(
            Column::new("Profit rate change", FormatMode::Percent).with_axis_floor(PROFIT_AXIS_FLOOR),
        );
        radar_values.push(profit_change);
        table_columns.push(Column::new("Profit rate", FormatMode::Percent));
        table_columns.push(Column::new("Previous profit rate", FormatMode::Percent));
        table_columns.push(Column::new("Profit rate change", FormatMode::Percent));
        table_values.extend([current_profit, previous_profit, profit_change]);

        let label = payload
            .label
            .clone()
            .unwrap_or_else(|| PLATFORM_TOTAL_LABEL.to_string());

        let mut radar = MetricTable::new(radar_columns);
        radar.push_row(Some(label.clone()), radar_values);
        self.push(widget, ChartKind::Radar, &radar);

        let mut table = MetricTable::new(table_columns);
        table.push_row(Some(label), table_values);
        self.push(widget, ChartKind::Table, &table);
    }

    fn platform_detail(&mut self, payload: &DashboardPayload) {
        let widget = Widget::PlatformDetail;
        let raw = payload.records(widget);
        let records = self.records(
            widget,
            raw,
            &PLATFORM_DETAIL,
            &["sales_volume", "order_count"],
        );

        let mut compared = Vec::with_capacity(records.len());
        for (idx, (record, source)) in records.into_iter().zip(raw).enumerate() {
            let change = self.checked_change(widget, idx, &record);
            compared.push((Compared { record, change }, source));
        }
        let ranked = top_n(
            &compared,
            |(item, _)| item.record.current,
            usize::MAX,
            RankOrder::Descending,
        );

        let mut table = MetricTable::new(vec![
            Column::new("Sales amount", FormatMode::Currency),
            Column::new("Sales volume", FormatMode::Plain),
            Column::new("Orders", FormatMode::Plain),
            Column::new("Previous amount", FormatMode::Currency),
            Column::new("Change", FormatMode::Percent),
        ]);
        for entry in &ranked {
            let (item, source) = entry.entity;
            table.push_row(
                item.record.entity.clone(),
                vec![
                    item.record.current,
                    source.number("sales_volume"),
                    source.number("order_count"),
                    effective_previous(&item.record),
                    item.change.percent_change,
                ],
            );
        }
        self.push(widget, ChartKind::Bar, &table);
        self.push(widget, ChartKind::Table, &table);
    }

    fn salesperson_comparison(&mut self, payload: &DashboardPayload) {
        let widget = Widget::SalespersonComparison;
        let raw = payload.records(widget);
        let records = self.records(widget, raw, &SALESPERSON, &SALESPERSON_EXTRA_NUMBERS);

        let mut people = Vec::with_capacity(records.len());
        for (idx, (record, source)) in records.into_iter().zip(raw).enumerate() {
            let change = self.checked_change(widget, idx, &record);
            let volume = source.first_number(&["current_volume", "sales_volume"]);
            let orders = source.first_number(&["current_orders", "order_count"]);
            let volume_change = compute_change(
                volume.unwrap_or(0.0),
                source.number("previous_volume"),
            );
            self.note_rate_check(
                widget,
                idx,
                "sales_volume",
                &volume_change,
                source.number("volume_change_rate"),
            );
            let orders_change = compute_change(
                orders.unwrap_or(0.0),
                source.number("previous_orders"),
            );
            self.note_rate_check(
                widget,
                idx,
                "order_count",
                &orders_change,
                source.number("orders_change_rate"),
            );
            let average_order = source
                .number("average_order")
                .or_else(|| average_order(record.current, orders));
            people.push(Salesperson {
                compared: Compared { record, change },
                volume,
                orders,
                average_order,
                volume_change: volume_change.percent_change,
                orders_change: orders_change.percent_change,
            });
        }

        let ranked = top_n(
            &people,
            |person| person.compared.record.current,
            usize::MAX,
            RankOrder::Descending,
        );

        let mut bar = MetricTable::new(vec![Column::new("Sales amount", FormatMode::Currency)]);
        let mut radar = MetricTable::new(vec![
            Column::new("Sales amount", FormatMode::Currency),
            Column::new("Sales volume", FormatMode::Plain),
            Column::new("Orders", FormatMode::Plain),
            Column::new("Average order", FormatMode::Currency),
            Column::new("Growth", FormatMode::Percent)
                .clamped()
                .with_axis_floor(GROWTH_AXIS_FLOOR)
                .with_headroom(1.0),
        ]);
        let mut table = MetricTable::new(vec![
            Column::new("Sales amount", FormatMode::Currency),
            Column::new("Previous amount", FormatMode::Currency),
            Column::new("Amount change", FormatMode::Percent),
            Column::new("Sales volume", FormatMode::Plain),
            Column::new("Volume change", FormatMode::Percent),
            Column::new("Orders", FormatMode::Plain),
            Column::new("Orders change", FormatMode::Percent),
            Column::new("Average order", FormatMode::Currency),
        ]);

        for entry in &ranked {
            let person = entry.entity;
            let record = &person.compared.record;
            let growth = person.compared.change.percent_change;
            bar.push_row(record.entity.clone(), vec![record.current]);
            radar.push_row(
                record.entity.clone(),
                vec![record.current, person.volume, person.orders, person.average_order, growth],
            );
            table.push_row(
                record.entity.clone(),
                vec![
                    record.current,
                    effective_previous(record),
                    growth,
                    person.volume,
                    person.volume_change,
                    person.orders,
                    person.orders_change,
                    person.average_order,
                ],
            );
        }

        self.push(widget, ChartKind::Bar, &bar);
        self.push(widget, ChartKind::Radar, &radar);
        self.push(widget, ChartKind::Table, &table);
    }

    fn platform_sales_distribution(&mut self, payload: &DashboardPayload) {
        let widget = Widget::PlatformSalesDistribution;
        let records = self.records(widget, payload.records(widget), &PLATFORM_SHARE, &[]);
        let dist = distribution(&records, |r| r.entity.clone(), |r| r.current);
        let table = MetricTable::from_distribution(&dist, Column::new("Sales", FormatMode::Currency));
        self.push(widget, ChartKind::Pie, &table);
        self.push(widget, ChartKind::Table, &table);
    }
}

struct Salesperson {
    compared: Compared,
    volume: Option<f64>,
    orders: Option<f64>,
    average_order: Option<f64>,
    volume_change: Option<f64>,
    orders_change: Option<f64>,
}

/// Percentage-point change of a profit rate; needs both sides.
fn profit_rate_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(current), Some(previous)) => Some(current - previous),
        _ => None,
    }
}

fn average_order(amount: Option<f64>, orders: Option<f64>) -> Option<f64> {
    match (amount, orders) {
        (Some(amount), Some(orders)) if orders > 0.0 => Some(amount / orders),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::remember_payload;
    use serde_json::json;

    fn sample_payload() -> DashboardPayload {
        DashboardPayload::from_value(json!({
            "period": "weekly",
            "label": "2024-W12",
            "top_sales_amount": [
                {"sku": "B-1", "product_name": "Budget Cable", "value": 100},
                {"sku": "A-1", "product_name": "Extremely Long Product Name Example", "value": 300},
            ],
            "top_increased": [
                {"sku": "U-1", "product_name": "Up", "current_value": 120, "previous_value": 100, "change_rate": 20.0},
                {"sku": "N-1", "product_name": "New", "current_value": 80, "previous_value": 0, "change_rate": 0},
            ],
            "top_decreased": [
                {"sku": "D-1", "product_name": "Down", "current_value": 3, "previous_value": 7, "change_rate": 99.0},
            ],
            "country_distribution": [
                {"country": "US", "value": 600, "previous_value": 500},
                {"country": "DE", "value": 400, "previous_value": 0},
            ],
            "platform_comparison": {
                "current_amount": 1200, "previous_amount": 1000, "amount_change_rate": 20.0,
                "current_volume": 50, "previous_volume": 0,
                "current_orders": 40, "previous_orders": 50,
                "current_profit_rate": 25.5, "previous_profit_rate": 20.0,
            },
            "salesperson_comparison": [
                {"sales_person": "Alice", "current_amount": 500, "previous_amount": 1000,
                 "current_volume": 10, "current_orders": 5},
                {"sales_person": "Bob", "current_amount": "oops", "previous_amount": 100},
            ],
            "platform_sales_distribution": {"Amazon": 750, "eBay": 250},
        }))
    }

    #[test]
    fn test_top_sales_amount_bar_is_ranked_and_truncated() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        let bar = views.view(Widget::TopSalesAmount, ChartKind::Bar).unwrap();
        assert_eq!(bar.labels, ["Extremely ...", "Budget Cab..."]);
        assert_eq!(bar.series, vec![vec![Some(300.0), Some(100.0)]]);
        assert!(
            bar.tooltip_for("Extremely ...")
                .unwrap()
                .starts_with("Extremely Long Product Name Example")
        );
    }

    #[test]
    fn test_product_changes_use_computed_rates() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        let increased = views.view(Widget::TopIncreased, ChartKind::Table).unwrap();
        assert_eq!(increased.labels, ["New", "Up"]);
        assert_eq!(increased.rows[0][1], "N/A");
        assert_eq!(increased.rows[1], ["Up", "+20.00%", "$120.00", "$100.00"]);

        let decreased = views.view(Widget::TopDecreased, ChartKind::Table).unwrap();
        assert_eq!(decreased.rows[0][1], "-57.14%");
        assert_eq!(views.rate_divergences, 1);
    }

    #[test]
    fn test_country_distribution_pie_and_growth() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        let pie = views.view(Widget::CountryDistribution, ChartKind::Pie).unwrap();
        assert_eq!(pie.labels, ["US", "DE"]);
        assert_eq!(pie.series[1], [Some(60.0), Some(40.0)]);
        let growth = views.view(Widget::CountryDistribution, ChartKind::Bar).unwrap();
        assert_eq!(growth.labels, ["DE", "US"]);
        assert_eq!(growth.series[0], [None, Some(20.0)]);
    }

    #[test]
    fn test_product_changes_rank_by_absolute_delta() {
        let payload = DashboardPayload::from_value(json!({
            "top_increased": [
                {"sku": "B-1", "product_name": "Big", "current_value": 2000, "previous_value": 1000},
                {"sku": "S-1", "product_name": "Small", "current_value": 40, "previous_value": 10},
            ],
            "top_decreased": [
                {"sku": "S-2", "product_name": "Slip", "current_value": 5, "previous_value": 50},
                {"sku": "D-2", "product_name": "Drop", "current_value": 1500, "previous_value": 3000},
            ],
        }));
        let views = compile_dashboard(&payload, &AssembleOptions::default());

        let increased = views.view(Widget::TopIncreased, ChartKind::Table).unwrap();
        assert_eq!(increased.labels, ["Big", "Small"]);
        assert_eq!(increased.rows[0][1], "+100.00%");
        assert_eq!(increased.rows[1][1], "+300.00%");

        let decreased = views.view(Widget::TopDecreased, ChartKind::Table).unwrap();
        assert_eq!(decreased.labels, ["Drop", "Slip"]);
        assert_eq!(decreased.rows[0][1], "-50.00%");
        assert_eq!(decreased.rows[1][1], "-90.00%");
    }

    #[test]
    fn test_salesperson_growth_axis_has_no_headroom() {
        let payload = DashboardPayload::from_value(json!({
            "salesperson_comparison": [
                {"sales_person": "Carol", "current_amount": 140, "previous_amount": 100,
                 "current_volume": 7, "current_orders": 2},
            ],
        }));
        let views = compile_dashboard(&payload, &AssembleOptions::default());
        let radar = views.view(Widget::SalespersonComparison, ChartKind::Radar).unwrap();
        assert_eq!(radar.axes[4].name, "Growth");
        assert!((radar.axes[4].max - 40.0).abs() < 1e-9);
        assert!((radar.axes[0].max - 140.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_platform_comparison_radar_and_table() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        let radar = views.view(Widget::PlatformComparison, ChartKind::Radar).unwrap();
        assert_eq!(radar.labels, ["2024-W12"]);
        assert_eq!(radar.axes.len(), 4);
        assert_eq!(radar.axes[0].max, 100.0);
        assert_eq!(radar.axes[3].max, 20.0);
        assert_eq!(radar.series[1], [None]);
        assert_eq!(radar.series[2], [Some(-20.0)]);
        assert_eq!(radar.series[3], [Some(5.5)]);

        let table = views.view(Widget::PlatformComparison, ChartKind::Table).unwrap();
        assert_eq!(table.rows[0][1], "$1,200.00");
        assert_eq!(table.rows[0][3], "+20.00%");
        assert_eq!(table.rows[0][6], "N/A");
    }

    #[test]
    fn test_salesperson_views_degrade_bad_records() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        assert_eq!(views.degraded_records, 1);
        let radar = views.view(Widget::SalespersonComparison, ChartKind::Radar).unwrap();
        assert_eq!(radar.labels, ["Alice", "Bob"]);
        assert_eq!(radar.series[4], [Some(0.0), Some(0.0)]);
        assert_eq!(radar.series[3], [Some(100.0), None]);
        let table = views.view(Widget::SalespersonComparison, ChartKind::Table).unwrap();
        assert_eq!(table.rows[0][3], "-50.00%");
        assert_eq!(table.rows[1][1], "N/A");
    }

    #[test]
    fn test_platform_sales_distribution_from_mapping() {
        let views = compile_dashboard(&sample_payload(), &AssembleOptions::default());
        let pie = views.view(Widget::PlatformSalesDistribution, ChartKind::Pie).unwrap();
        assert_eq!(pie.labels, ["Amazon", "eBay"]);
        assert_eq!(pie.series[1], [Some(75.0), Some(25.0)]);
    }

    #[test]
    fn test_empty_payload_yields_empty_views() {
        let views = compile_dashboard(&DashboardPayload::default(), &AssembleOptions::default());
        assert!(!views.views.is_empty());
        assert!(views.views.iter().all(|named| named.view.is_empty()));
        assert_eq!(views.degraded_records, 0);
    }

    #[test]
    fn test_compile_latest_uses_stored_payload() {
        remember_payload(sample_payload());
        let views = compile_latest(&AssembleOptions::default()).unwrap();
        assert!(views.view(Widget::TopSalesAmount, ChartKind::Bar).is_some());
    }
}
