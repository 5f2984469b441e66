use pf_common::EngineError;
use serde::{Deserialize, Serialize};

use crate::group::SpreadMethod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
    pub fy_start_month: u32,
    #[serde(default)]
    pub prefill_lookups: bool,
    #[serde(default = "default_spread_method")]
    pub default_spread_method: SpreadMethod,
}

fn default_spread_method() -> SpreadMethod {
    SpreadMethod::Lookup
}

impl Config {
    /// Derives `N`, the monthly horizon length (§3). Invariant: `N >= 1`.
    pub fn n(&self) -> Result<usize, EngineError> {
        if self.fy_start_month < 1 || self.fy_start_month > 12 {
            return Err(EngineError::InvalidFiscalYearStart(self.fy_start_month as i32));
        }
        let n = (self.end_year - self.start_year) * 12 + (self.end_month as i32 - self.start_month as i32) + 1;
        if n < 1 {
            return Err(EngineError::InvertedTimeline {
                start_year: self.start_year,
                start_month: self.start_month,
                end_year: self.end_year,
                end_month: self.end_month,
            });
        }
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(sy: i32, sm: u32, ey: i32, em: u32) -> Config {
        Config {
            start_year: sy,
            start_month: sm,
            end_year: ey,
            end_month: em,
            fy_start_month: 7,
            prefill_lookups: false,
            default_spread_method: SpreadMethod::Lookup,
        }
    }

    #[test]
    fn n_one_full_year() {
        assert_eq!(cfg(2024, 1, 2024, 12).n().unwrap(), 12);
    }

    #[test]
    fn n_single_month() {
        assert_eq!(cfg(2024, 1, 2024, 1).n().unwrap(), 1);
    }

    #[test]
    fn inverted_timeline_errors() {
        assert!(cfg(2024, 6, 2024, 1).n().is_err());
    }
}
