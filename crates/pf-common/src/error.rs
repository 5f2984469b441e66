//! The one class of error that is fatal for a whole pass (§7: config errors).
//! Everything else degrades to a [`crate::Diagnostic`] instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("timeline end ({end_year}-{end_month:02}) precedes start ({start_year}-{start_month:02})")]
    InvertedTimeline {
        start_year: i32,
        start_month: u32,
        end_year: i32,
        end_month: u32,
    },
    #[error("fiscal year start month must be in 1..=12, got {0}")]
    InvalidFiscalYearStart(i32),
}
