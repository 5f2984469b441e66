//! Input lowering (§4.3): turn one input's declarative parameters into a
//! dense length-`N` monthly array.

use crate::group::{Frequency, SpreadMethod};
use crate::input::Input;
use crate::timeline::Timeline;

/// Values mode: the array at month `i` is simply the stored value at month
/// `i` — display-period writes are expected to have already spread `x/m`
/// into each of the period's `m` months (flow semantics) before storage.
pub fn lower_values(input: &Input, n: usize) -> Vec<f64> {
    (0..n).map(|i| input.values.get(&i).copied().unwrap_or(0.0)).collect()
}

/// Spreads value `x` written at display period `p` (frequency with
/// `months_per_period = m`) into `x/m` across each of that period's months,
/// into an **absolute-month-indexed** values map (flow semantics).
pub fn write_values_period(values: &mut rustc_hash::FxHashMap<usize, f64>, period: usize, months_per_period: usize, x: f64) {
    let per_month = x / months_per_period as f64;
    for m in 0..months_per_period {
        values.insert(period * months_per_period + m, per_month);
    }
}

/// Constant mode (§4.3): `lookup` repeats `value` every month (stock);
/// `spread` divides `value` evenly across all `N` months (flow).
pub fn lower_constant(value: f64, method: SpreadMethod, n: usize) -> Vec<f64> {
    match method {
        SpreadMethod::Lookup => vec![value; n],
        SpreadMethod::Spread => vec![value / n as f64; n],
    }
}

/// Series mode (§4.3): one month per series period (the payment month)
/// carries the period value, all others are zero.
pub fn lower_series(input: &Input, timeline: &Timeline) -> Vec<f64> {
    let n = timeline.n;
    let mut out = vec![0.0; n];

    let annual = match input.series_annual_value {
        Some(v) => v,
        None => return out,
    };
    let fs = match input.series_frequency {
        Some(f) => f,
        None => return out,
    };
    let pm = match input.series_payment_month {
        Some(p) => p,
        None => return out,
    };

    let start_idx = input
        .series_start_date
        .as_ref()
        .map(|d| month_offset(timeline, d.year, d.month))
        .unwrap_or(0)
        .max(0) as usize;

    let end_idx: usize = if input.series_range_end {
        n.saturating_sub(1)
    } else {
        match &input.series_end_date {
            Some(d) => {
                let idx = month_offset(timeline, d.year, d.month);
                // explicit end date: end-exclusive, so the window's last
                // included month is idx - 1.
                if idx <= 0 {
                    return out;
                }
                ((idx - 1).max(0) as usize).min(n.saturating_sub(1))
            }
            None => n.saturating_sub(1),
        }
    };

    if start_idx > end_idx || start_idx >= n {
        return out;
    }

    let period_value = annual / fs.periods_per_year();

    for i in start_idx..=end_idx.min(n - 1) {
        let (_, month) = timeline.year_month(i);
        let pays = match fs {
            Frequency::M => true,
            Frequency::Q => pm >= 1 && pm <= 3 && (month - 1) % 3 == (pm - 1),
            Frequency::Y | Frequency::FY => month == pm,
        };
        if pays {
            out[i] = period_value;
        }
    }
    out
}

fn month_offset(timeline: &Timeline, year: i32, month: u32) -> i64 {
    (year as i64 - timeline.start_year as i64) * 12 + (month as i64 - timeline.start_month as i64)
}

/// Lookup / Lookup2 mode (§4.3): storage is already absolute-month-indexed
/// (Lookup via `monthOffset = lookupStart - modelStart`, Lookup2 aligned
/// directly to model start with no offset), so lowering just reads the
/// stored monthly map. When `prefill` is set, zero gaps between non-zero
/// values are forward-filled (a read-side concern, per §9 design notes —
/// never written back into stored state).
pub fn lower_lookup(input: &Input, n: usize, prefill: bool) -> Vec<f64> {
    let mut out: Vec<f64> = (0..n).map(|i| input.values.get(&i).copied().unwrap_or(0.0)).collect();
    if prefill {
        let mut last = 0.0;
        let mut have_last = false;
        for v in out.iter_mut() {
            if *v != 0.0 {
                last = *v;
                have_last = true;
            } else if have_last {
                *v = last;
            }
        }
    }
    out
}

/// Writes lookup-period `p` (within the group's own period indexing) to
/// `x`, spreading the same value across all `m` months of that period, at
/// absolute-month offset `month_offset` (0 for Lookup2).
pub fn write_lookup_period(
    values: &mut rustc_hash::FxHashMap<usize, f64>,
    period: usize,
    months_per_period: usize,
    month_offset: i64,
    x: f64,
) {
    for m in 0..months_per_period {
        let abs = month_offset + (period * months_per_period + m) as i64;
        if abs >= 0 {
            values.insert(abs as usize, x);
        }
    }
}
