//! Stats module - KPI computation

mod kpi;

pub use kpi::{format_thousands, KpiCalculator, KpiError, Kpis};
