//! KPI Calculator Module
//! Reduces the cleaned sales table to six headline metrics.

use crate::data::schema::{DISCOUNT, PROFIT, QUANTITY, REVENUE};
use crate::data::SalesTable;
use polars::prelude::PolarsError;
use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("Cannot compute KPIs: dataset has no records")]
    EmptyDataset,
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Headline metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_units: f64,
    pub average_order_value: f64,
    pub average_discount: f64,
    pub total_profit: f64,
}

impl Kpis {
    /// Display names and values, in report order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("Total Revenue", self.total_revenue),
            ("Total Orders", self.total_orders as f64),
            ("Total Units", self.total_units),
            ("Average Order Value", self.average_order_value),
            ("Average Discount", self.average_discount),
            ("Total Profit", self.total_profit),
        ]
    }
}

pub struct KpiCalculator;

impl KpiCalculator {
    pub fn compute(table: &SalesTable) -> Result<Kpis, KpiError> {
        if table.is_empty() {
            return Err(KpiError::EmptyDataset);
        }

        let total_orders = table.height();
        let total_revenue = table.sum(REVENUE)?;

        Ok(Kpis {
            total_revenue,
            total_orders,
            total_units: table.sum(QUANTITY)?,
            average_order_value: total_revenue / total_orders as f64,
            average_discount: table.values(DISCOUNT)?.mean(),
            total_profit: table.sum(PROFIT)?,
        })
    }
}

/// Format with thousands separators and two decimals: `1234567.891` -> `1,234,567.89`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // "-0.00" is not worth a sign
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
