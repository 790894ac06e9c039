//! Sales CSV Loader Module
//! Parses the Latin-1 encoded source file with Polars, normalizes headers,
//! coerces typed columns and derives the month/year/revenue/unit_price columns.

use crate::data::schema::{self, NUMERIC_COLUMNS};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Date layouts accepted in `order_date`, tried in order.
const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Cannot coerce {column} value {value:?} in data row {row}")]
    TypeCoercion {
        column: String,
        /// 1-based, header excluded.
        row: usize,
        value: String,
    },
}

/// The cleaned sales table: normalized headers, typed columns, derived columns.
#[derive(Debug, Clone)]
pub struct SalesTable {
    df: DataFrame,
}

impl SalesTable {
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of records.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Sum of a Float64 column, nulls skipped.
    pub fn sum(&self, column: &str) -> PolarsResult<f64> {
        let series = self.df.column(column)?.as_materialized_series();
        Ok(series.f64()?.sum().unwrap_or(0.0))
    }

    /// Non-null values of a Float64 column.
    pub fn values(&self, column: &str) -> PolarsResult<Vec<f64>> {
        let series = self.df.column(column)?.as_materialized_series();
        Ok(series.f64()?.into_iter().flatten().collect())
    }
}

/// Handles loading and cleaning of the sales CSV.
pub struct DataLoader;

impl DataLoader {
    /// Load and clean the sales file at `path`.
    pub fn load_sales(path: &Path) -> Result<SalesTable, LoaderError> {
        let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loading {} ({} bytes)", path.display(), bytes.len());
        Self::parse_bytes(&bytes)
    }

    /// Clean an in-memory Latin-1 CSV.
    pub fn parse_bytes(bytes: &[u8]) -> Result<SalesTable, LoaderError> {
        let text = Self::decode_latin1(bytes);

        // Everything is read as strings; coercion happens column by column
        // so failures can name the offending value.
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()?;

        Self::normalize_headers(&mut df)?;
        if let Some(missing) = schema::find_missing_column(&df) {
            return Err(LoaderError::MissingColumn(missing.to_string()));
        }

        for name in NUMERIC_COLUMNS {
            let values = Self::coerce_numeric(&df, name)?;
            df.with_column(Series::new(name.into(), values))?;
        }
        let dates = Self::coerce_dates(&df, schema::ORDER_DATE)?;
        df.with_column(
            DateChunked::from_naive_date(schema::ORDER_DATE.into(), dates.iter().copied())
                .into_series(),
        )?;

        Self::derive_columns(&mut df, &dates)?;
        debug!("cleaned table: {} rows x {} columns", df.height(), df.width());

        Ok(SalesTable { df })
    }

    /// ISO-8859-1 maps every byte to the code point of the same value.
    fn decode_latin1(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| b as char).collect()
    }

    fn normalize_headers(df: &mut DataFrame) -> PolarsResult<()> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| schema::normalize_column_name(name.as_str()))
            .collect();
        df.set_column_names(names)
    }

    fn string_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a StringChunked, LoaderError> {
        Ok(df.column(column)?.as_materialized_series().str()?)
    }

    fn coerce_numeric(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, LoaderError> {
        let raw = Self::string_column(df, column)?;
        raw.into_iter()
            .enumerate()
            .map(|(i, value)| match value.map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
                    LoaderError::TypeCoercion {
                        column: column.to_string(),
                        row: i + 1,
                        value: text.to_string(),
                    }
                }),
            })
            .collect()
    }

    fn coerce_dates(df: &DataFrame, column: &str) -> Result<Vec<NaiveDate>, LoaderError> {
        let raw = Self::string_column(df, column)?;
        raw.into_iter()
            .enumerate()
            .map(|(i, value)| {
                let text = value.unwrap_or("").trim();
                parse_date(text).ok_or_else(|| LoaderError::TypeCoercion {
                    column: column.to_string(),
                    row: i + 1,
                    value: text.to_string(),
                })
            })
            .collect()
    }

    fn derive_columns(df: &mut DataFrame, dates: &[NaiveDate]) -> Result<(), LoaderError> {
        let months: Vec<String> = dates.iter().map(|d| d.format("%Y-%m").to_string()).collect();
        let years: Vec<i32> = dates.iter().map(|d| d.year()).collect();

        let revenue = df
            .column(schema::SALES)?
            .as_materialized_series()
            .clone()
            .with_name(schema::REVENUE.into());

        let mut zero_quantity = 0usize;
        let unit_price: Vec<Option<f64>> = {
            let revenue_ca = revenue.f64()?;
            let quantity_ca = df.column(schema::QUANTITY)?.as_materialized_series().f64()?;
            revenue_ca
                .into_iter()
                .zip(quantity_ca.into_iter())
                .map(|(rev, qty)| match (rev, qty) {
                    (Some(_), Some(q)) if q == 0.0 => {
                        zero_quantity += 1;
                        None
                    }
                    (Some(r), Some(q)) => Some(r / q),
                    _ => None,
                })
                .collect()
        };
        if zero_quantity > 0 {
            warn!("{} rows with zero quantity; unit_price left null", zero_quantity);
        }

        df.with_column(Series::new(schema::MONTH.into(), months))?;
        df.with_column(Series::new(schema::YEAR.into(), years))?;
        df.with_column(revenue)?;
        df.with_column(Series::new(schema::UNIT_PRICE.into(), unit_price))?;
        Ok(())
    }
}

/// Parse an order date in any of the accepted layouts.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}
