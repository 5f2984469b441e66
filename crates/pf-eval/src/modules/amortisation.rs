//! Straight-line amortisation (§4.8): a closed-form CUMSUM forward pass
//! with the stock identity `close = opening + addition - expense`. Supports
//! a "one-time at onset" schedule and a "periodic additions" schedule.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use pf_common::value::safe_div;

use super::resolve::{resolve_module_input, resolve_module_input_array};

/// Typed inputs for the straight-line amortisation calculator (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct AmortisationInputs {
    pub useful_life_months: f64,
    pub additions: Vec<f64>,
}

impl AmortisationInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        let mode = inputs.get("mode").and_then(|v| v.as_str()).unwrap_or("onset");
        let useful_life_months = inputs.get("usefulLifeMonths").map(|v| resolve_module_input(v, ctx, 1.0)).unwrap_or(1.0).max(1.0);

        let additions: Vec<f64> = if mode == "periodic" {
            inputs.get("additions").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n])
        } else {
            let onset_amount = inputs.get("onsetAmount").map(|v| resolve_module_input(v, ctx, 0.0)).unwrap_or(0.0);
            let mut a = vec![0.0; n];
            if n > 0 {
                a[0] = onset_amount;
            }
            a
        };

        Self { useful_life_months, additions }
    }
}

pub fn calculate(inputs: &AmortisationInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let useful_life_months = inputs.useful_life_months;
    let additions = inputs.additions.clone();

    let mut opening = vec![0.0; n];
    let mut expense = vec![0.0; n];
    let mut closing = vec![0.0; n];

    let mut balance = 0.0;
    // Tracks each addition's remaining amortisation life independently so
    // periodic additions each straight-line off over the same useful life.
    let mut cohorts: Vec<(f64, f64)> = Vec::new(); // (remaining_months, per_month_expense)

    for i in 0..n {
        opening[i] = balance;
        if additions[i] != 0.0 {
            let per_month = safe_div(additions[i], useful_life_months);
            cohorts.push((useful_life_months, per_month));
            balance += additions[i];
        }

        let mut period_expense = 0.0;
        for cohort in cohorts.iter_mut() {
            if cohort.0 > 0.0 {
                period_expense += cohort.1;
                cohort.0 -= 1.0;
            }
        }
        period_expense = period_expense.min(balance);
        expense[i] = period_expense;
        balance -= period_expense;
        closing[i] = balance;
    }

    let mut out = FxHashMap::default();
    out.insert("opening".to_string(), opening);
    out.insert("additions".to_string(), additions);
    out.insert("expense".to_string(), expense);
    out.insert("closing".to_string(), closing);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn onset_mode_amortises_evenly_over_useful_life() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("mode".to_string(), json!("onset"));
        inputs.insert("onsetAmount".to_string(), json!(120.0));
        inputs.insert("usefulLifeMonths".to_string(), json!(12));
        let resolved = AmortisationInputs::resolve(&inputs, &ctx, 12);
        let out = calculate(&resolved, 12);
        for i in 0..12 {
            assert!((out["expense"][i] - 10.0).abs() < 1e-9);
        }
        assert!(out["closing"][11].abs() < 1e-9);
    }

    #[test]
    fn stock_identity_holds_every_period() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("mode".to_string(), json!("periodic"));
        inputs.insert("additions".to_string(), json!([100.0, 0.0, 50.0, 0.0]));
        inputs.insert("usefulLifeMonths".to_string(), json!(4));
        let resolved = AmortisationInputs::resolve(&inputs, &ctx, 4);
        let out = calculate(&resolved, 4);
        for i in 0..4 {
            let expected = out["opening"][i] + out["additions"][i] - out["expense"][i];
            assert!((expected - out["closing"][i]).abs() < 1e-9);
        }
    }
}
