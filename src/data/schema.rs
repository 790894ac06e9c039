//! Expected sales columns and header normalization.

use polars::prelude::*;

pub const ORDER_DATE: &str = "order_date";
pub const SALES: &str = "sales";
pub const QUANTITY: &str = "quantity";
pub const DISCOUNT: &str = "discount";
pub const PROFIT: &str = "profit";
pub const REGION: &str = "region";
pub const PRODUCT_NAME: &str = "product_name";

// Derived
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";
pub const REVENUE: &str = "revenue";
pub const UNIT_PRICE: &str = "unit_price";

/// Columns that must be present after header normalization.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    ORDER_DATE,
    SALES,
    QUANTITY,
    DISCOUNT,
    PROFIT,
    REGION,
    PRODUCT_NAME,
];

/// Numeric columns coerced to Float64 at load time.
pub const NUMERIC_COLUMNS: [&str; 4] = [SALES, QUANTITY, DISCOUNT, PROFIT];

/// "Order Date" -> "order_date", "Sub-Category" -> "sub_category".
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Return the first required column missing from `df`, if any.
pub fn find_missing_column(df: &DataFrame) -> Option<&'static str> {
    let schema = df.schema();
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|name| !schema.contains(name))
}
