use proptest::prelude::*;
use sales_analyser::data::{Aggregator, DataLoader};
use sales_analyser::stats::KpiCalculator;

const HEADER: &str = "Order Date,Region,Product Name,Sales,Quantity,Discount,Profit\n";
const REGIONS: [&str; 4] = ["East", "West", "Central", "South"];

fn record() -> impl Strategy<Value = String> {
    (
        2014..2018i32,
        1..=12u32,
        1..=28u32,
        0..REGIONS.len(),
        0..25usize,
        0..100_000u32,
        1..10u32,
    )
        .prop_map(|(y, m, d, region, product, cents, qty)| {
            format!(
                "{m}/{d}/{y},{},Product {product},{}.{:02},{qty},0.1,1.5\n",
                REGIONS[region],
                cents / 100,
                cents % 100
            )
        })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn summaries_agree_with_total_revenue(rows in prop::collection::vec(record(), 1..60)) {
        let csv = format!("{HEADER}{}", rows.concat());
        let table = DataLoader::parse_bytes(csv.as_bytes()).unwrap();
        let kpis = KpiCalculator::compute(&table).unwrap();
        let aggregates = Aggregator::aggregate(&table).unwrap();

        let monthly = aggregates.monthly_series().unwrap();
        let region = aggregates.region_series().unwrap();
        prop_assert!(close(monthly.total(), kpis.total_revenue));
        prop_assert!(close(region.total(), kpis.total_revenue));
        prop_assert!(monthly.labels.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(kpis.total_orders, rows.len());

        let products = aggregates.product_series().unwrap();
        prop_assert!(products.len() <= 10);
        prop_assert!(products.values.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(products.total() <= kpis.total_revenue + 1e-6);
    }
}
