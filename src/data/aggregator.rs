//! Aggregation Module
//! Groups the cleaned sales table by month, region and product.

use crate::data::loader::SalesTable;
use crate::data::schema::{MONTH, PRODUCT_NAME, REGION, REVENUE};
use polars::prelude::*;
use thiserror::Error;

/// Number of rows kept in the top products table.
pub const TOP_PRODUCTS: u32 = 10;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// The three summary tables every renderer consumes.
///
/// Each frame has two columns: the grouping key and `revenue`.
#[derive(Debug, Clone)]
pub struct Aggregates {
    /// `month`, `revenue` in ascending month order.
    pub monthly: DataFrame,
    /// `region`, `revenue` in first-seen order.
    pub region: DataFrame,
    /// `product_name`, `revenue`, descending, at most ten rows.
    pub products: DataFrame,
}

/// Labels and values of a two-column summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl CategorySeries {
    /// Extract `key` as labels and `value` as numbers. Nulls become "" / 0.
    pub fn from_frame(df: &DataFrame, key: &str, value: &str) -> PolarsResult<Self> {
        let keys = df.column(key)?.as_materialized_series().cast(&DataType::String)?;
        let labels = keys
            .str()?
            .into_iter()
            .map(|k| k.unwrap_or_default().to_string())
            .collect();
        let values = df
            .column(value)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        Ok(Self { labels, values })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

impl Aggregates {
    pub fn monthly_series(&self) -> PolarsResult<CategorySeries> {
        CategorySeries::from_frame(&self.monthly, MONTH, REVENUE)
    }

    pub fn region_series(&self) -> PolarsResult<CategorySeries> {
        CategorySeries::from_frame(&self.region, REGION, REVENUE)
    }

    pub fn product_series(&self) -> PolarsResult<CategorySeries> {
        CategorySeries::from_frame(&self.products, PRODUCT_NAME, REVENUE)
    }
}

/// Handles the group-by reductions.
pub struct Aggregator;

impl Aggregator {
    /// Build monthly, regional and top-product revenue tables.
    pub fn aggregate(table: &SalesTable) -> Result<Aggregates, AggregateError> {
        let df = table.dataframe();
        Ok(Aggregates {
            monthly: Self::monthly_revenue(df)?,
            region: Self::region_revenue(df)?,
            products: Self::top_products(df, TOP_PRODUCTS)?,
        })
    }

    /// Revenue per month, ascending `YYYY-MM`.
    pub fn monthly_revenue(df: &DataFrame) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .group_by([col(MONTH)])
            .agg([col(REVENUE).sum()])
            .sort([MONTH], SortMultipleOptions::default())
            .collect()
    }

    /// Revenue per region, groups in order of first appearance.
    pub fn region_revenue(df: &DataFrame) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .group_by_stable([col(REGION)])
            .agg([col(REVENUE).sum()])
            .collect()
    }

    /// Highest-revenue products. Ties keep first-appearance order.
    pub fn top_products(df: &DataFrame, limit: u32) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .group_by_stable([col(PRODUCT_NAME)])
            .agg([col(REVENUE).sum()])
            .sort(
                [REVENUE],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::DataLoader;

    const HEADER: &str = "Order Date,Region,Product Name,Sales,Quantity,Discount,Profit\n";

    fn aggregates(rows: &str) -> Aggregates {
        let table = DataLoader::parse_bytes(format!("{HEADER}{rows}").as_bytes()).unwrap();
        Aggregator::aggregate(&table).unwrap()
    }

    #[test]
    fn two_record_example() {
        let agg = aggregates(
            "2023-01-15,East,Widget,100,2,0,20\n\
             2023-01-20,West,Gadget,50,1,0,5\n",
        );

        let monthly = agg.monthly_series().unwrap();
        assert_eq!(monthly.labels, ["2023-01"]);
        assert_eq!(monthly.values, [150.0]);

        let region = agg.region_series().unwrap();
        assert_eq!(region.labels, ["East", "West"]);
        assert_eq!(region.values, [100.0, 50.0]);

        let products = agg.product_series().unwrap();
        assert_eq!(products.labels, ["Widget", "Gadget"]);
        assert_eq!(products.values, [100.0, 50.0]);
    }

    #[test]
    fn months_sorted_regions_in_first_seen_order() {
        let agg = aggregates(
            "2023-03-01,West,A,1,1,0,0\n\
             2022-12-31,South,B,2,1,0,0\n\
             2023-01-05,East,C,3,1,0,0\n\
             2023-03-09,South,D,4,1,0,0\n",
        );

        let monthly = agg.monthly_series().unwrap();
        assert_eq!(monthly.labels, ["2022-12", "2023-01", "2023-03"]);
        assert_eq!(monthly.values, [2.0, 3.0, 5.0]);

        let region = agg.region_series().unwrap();
        assert_eq!(region.labels, ["West", "South", "East"]);
        assert_eq!(region.values, [1.0, 6.0, 3.0]);
    }

    #[test]
    fn top_products_truncated_and_ties_stable() {
        let mut rows = String::new();
        for i in 0..12 {
            rows.push_str(&format!("2023-01-01,East,P{i},{},1,0,0\n", 100 - i));
        }
        // P12 and P13 tie with P0 once summed; they must follow it.
        rows.push_str("2023-01-02,East,P12,100,1,0,0\n");
        rows.push_str("2023-01-02,East,P13,60,1,0,0\n2023-01-03,East,P13,40,1,0,0\n");

        let products = aggregates(&rows).product_series().unwrap();
        assert_eq!(products.len(), 10);
        assert_eq!(&products.labels[..4], ["P0", "P12", "P13", "P1"]);
        assert!(products.values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn empty_table_gives_empty_aggregates() {
        let agg = aggregates("");
        assert!(agg.monthly_series().unwrap().is_empty());
        assert!(agg.region_series().unwrap().is_empty());
        assert!(agg.product_series().unwrap().is_empty());
    }
}
