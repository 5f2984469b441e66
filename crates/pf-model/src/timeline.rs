//! The monthly horizon and per-period calendar (§4.1).

use chrono::{Datelike, Months, NaiveDate};

use pf_common::EngineError;

use crate::config::Config;
use crate::group::Frequency;

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub n: usize,
    pub start_year: i32,
    pub start_month: u32,
    fy_start_month: u32,
    /// Months the first fiscal year (containing the model start) already had
    /// elapsed before the model horizon began; used to align FY buckets.
    fy_offset: u32,
}

impl Timeline {
    pub fn from_config(cfg: &Config) -> Result<Self, EngineError> {
        let n = cfg.n()?;
        let fy_offset = (cfg.start_month + 12 - cfg.fy_start_month) % 12;
        Ok(Self {
            n,
            start_year: cfg.start_year,
            start_month: cfg.start_month,
            fy_start_month: cfg.fy_start_month,
            fy_offset,
        })
    }

    /// Calendar `(year, month)` for absolute month index `i`, via
    /// `chrono`'s calendar-aware month arithmetic rather than hand-rolled
    /// modulo bucketing.
    pub fn year_month(&self, i: usize) -> (i32, u32) {
        let base = NaiveDate::from_ymd_opt(self.start_year, self.start_month, 1).expect("config guarantees a valid start date");
        let date = base.checked_add_months(Months::new(i as u32)).expect("month index within a representable calendar range");
        (date.year(), date.month())
    }

    /// Month index in `[0, N)` since the **model start**, independent of
    /// frequency — this is what Monthly frequency resolves `period_index` to.
    pub fn month_index(&self, i: usize) -> usize {
        i
    }

    pub fn period_index(&self, i: usize, freq: Frequency) -> usize {
        match freq {
            Frequency::M => i,
            Frequency::Q => i / 3,
            Frequency::Y => i / 12,
            Frequency::FY => (i as u32 + self.fy_offset) as usize / 12,
        }
    }

    /// True when month `i` is the last month of its period at `freq` — the
    /// last index of the horizon always counts as a period end.
    pub fn is_period_end(&self, i: usize, freq: Frequency) -> bool {
        if i + 1 >= self.n {
            return true;
        }
        self.period_index(i, freq) != self.period_index(i + 1, freq)
    }

    pub fn months_in_range(&self) -> std::ops::Range<usize> {
        0..self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::SpreadMethod;

    fn timeline(sy: i32, sm: u32, ey: i32, em: u32, fy: u32) -> Timeline {
        let cfg = Config {
            start_year: sy,
            start_month: sm,
            end_year: ey,
            end_month: em,
            fy_start_month: fy,
            prefill_lookups: false,
            default_spread_method: SpreadMethod::Lookup,
        };
        Timeline::from_config(&cfg).unwrap()
    }

    #[test]
    fn year_month_wraps_correctly() {
        let t = timeline(2024, 11, 2025, 12, 1);
        assert_eq!(t.year_month(0), (2024, 11));
        assert_eq!(t.year_month(1), (2024, 12));
        assert_eq!(t.year_month(2), (2025, 1));
    }

    #[test]
    fn quarterly_groups_months() {
        let t = timeline(2024, 1, 2024, 12, 1);
        assert_eq!(t.period_index(0, Frequency::Q), 0);
        assert_eq!(t.period_index(2, Frequency::Q), 0);
        assert_eq!(t.period_index(3, Frequency::Q), 1);
        assert!(t.is_period_end(2, Frequency::Q));
        assert!(!t.is_period_end(1, Frequency::Q));
    }

    #[test]
    fn fiscal_year_bucket_with_offset_start() {
        // FY starts in July; model starts in January, so month index 0 is
        // already 6 months into FY0 (which began the previous July).
        let t = timeline(2024, 1, 2025, 12, 7);
        assert_eq!(t.period_index(0, Frequency::FY), 0);
        assert_eq!(t.period_index(5, Frequency::FY), 0);
        assert_eq!(t.period_index(6, Frequency::FY), 1);
    }

    #[test]
    fn last_month_is_always_a_period_end() {
        let t = timeline(2024, 1, 2024, 2, 1);
        assert!(t.is_period_end(1, Frequency::Y));
    }
}
