//! Dashboard computations.
//!
//! This module turns the loaded tables into dashboard data:
//! - Semester: academic semester labels
//! - Join: purchases widened with event and student attributes
//! - Filter: semester or date-range selection
//! - Aggregate: monthly series, nationalities, KPIs
//! - Cohort: retention matrix
//! - Browser: raw tables and CSV export
//! - Diagnostics: date coverage per table
//! - Pipeline: one full dashboard computation

pub mod aggregate;
pub mod browser;
pub mod cohort;
pub mod diagnostics;
pub mod filter;
pub mod join;
pub mod pipeline;
pub mod semester;

pub use aggregate::*;
pub use browser::*;
pub use cohort::*;
pub use diagnostics::*;
pub use filter::*;
pub use join::enrich_purchases;
pub use pipeline::*;
pub use semester::*;
