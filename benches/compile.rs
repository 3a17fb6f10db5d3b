use criterion::{Criterion, black_box, criterion_group, criterion_main};
use salesview::payload::DashboardPayload;
use salesview::{AssembleOptions, compile_dashboard};
use serde_json::{Value, json};

const PRODUCTS: usize = 500;
const COUNTRIES: usize = 40;
const SALESPEOPLE: usize = 25;

fn synthetic_payload() -> DashboardPayload {
    let products: Vec<Value> = (0..PRODUCTS)
        .map(|idx| {
            let current = (idx * 37 % 1000) as f64 + 0.5;
            let previous = (idx * 53 % 900) as f64;
            json!({
                "sku": format!("SKU-{idx:04}"),
                "product_name": format!("Synthetic Product Number {idx}"),
                "value": current,
                "current_value": current,
                "previous_value": previous,
            })
        })
        .collect();
    let countries: Vec<Value> = (0..COUNTRIES)
        .map(|idx| json!({"country": format!("C{idx}"), "value": idx * 100, "previous_value": idx * 90}))
        .collect();
    let people: Vec<Value> = (0..SALESPEOPLE)
        .map(|idx| {
            json!({
                "sales_person": format!("Person {idx}"),
                "current_amount": idx * 1000,
                "previous_amount": idx * 800,
                "current_volume": idx * 20,
                "current_orders": idx * 10,
            })
        })
        .collect();

    DashboardPayload::from_value(json!({
        "period": "monthly",
        "top_sales_volume": products,
        "top_sales_amount": products,
        "top_increased": products,
        "top_decreased": products,
        "country_distribution": countries,
        "salesperson_comparison": people,
        "platform_comparison": {"current_amount": 5000, "previous_amount": 4000},
        "platform_sales_distribution": {"Amazon": 3000, "eBay": 1500, "Shopify": 500},
    }))
}

fn bench_compile(c: &mut Criterion) {
    let payload = synthetic_payload();
    let options = AssembleOptions::default();
    let unlimited = AssembleOptions {
        top_count: 0,
        ..AssembleOptions::default()
    };

    c.bench_function("compile_dashboard_top5", |b| {
        b.iter(|| compile_dashboard(black_box(&payload), black_box(&options)));
    });
    c.bench_function("compile_dashboard_all_rows", |b| {
        b.iter(|| compile_dashboard(black_box(&payload), black_box(&unlimited)));
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
