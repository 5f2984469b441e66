//! Distributions waterfall (§4.8): restricted covenant tests, a
//! return-of-capital-then-dividends waterfall, historic ADSCR, and the
//! lockup flag. `fullyConverted` upstream; the calculator here produces
//! the subset of the 24 declared outputs that depend on the lockup state
//! machine rather than being plain single-period formulas (those are left
//! to ordinary calculations per §4.5 `convertedOutputs`).

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use pf_common::value::safe_div;

use super::resolve::{resolve_module_input, resolve_module_input_array};

/// Typed inputs for the distributions waterfall calculator (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct DistributionsInputs {
    pub cfads: Vec<f64>,
    pub debt_service: Vec<f64>,
    pub npat: Vec<f64>,
    pub reserve_requirement: Vec<f64>,
    pub cash_available: Vec<f64>,
    pub quarter_end_flag: Vec<f64>,
    pub sc_unreturned_opening: f64,
    pub re_threshold: f64,
    pub release_threshold: f64,
}

impl DistributionsInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self {
            cfads: inputs.get("cfads").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            debt_service: inputs.get("debtService").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            npat: inputs.get("npat").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            reserve_requirement: inputs.get("reserveRequirement").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            cash_available: inputs.get("cashAvailable").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            quarter_end_flag: inputs.get("quarterEndFlag").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            sc_unreturned_opening: inputs.get("scCapitalOutstanding").map(|v| resolve_module_input(v, ctx, 0.0)).unwrap_or(0.0),
            re_threshold: inputs.get("reThreshold").map(|v| resolve_module_input(v, ctx, 1.0)).unwrap_or(1.0),
            release_threshold: inputs.get("lockupReleaseThreshold").map(|v| resolve_module_input(v, ctx, 4.0)).unwrap_or(4.0),
        }
    }
}

pub fn calculate(inputs: &DistributionsInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let cfads = &inputs.cfads;
    let debt_service = &inputs.debt_service;
    let npat = &inputs.npat;
    let reserve_requirement = &inputs.reserve_requirement;
    let cash_available = &inputs.cash_available;
    let quarter_end_flag = &inputs.quarter_end_flag;
    let sc_unreturned_opening = inputs.sc_unreturned_opening;
    let re_threshold = inputs.re_threshold;
    let release_threshold = inputs.release_threshold;

    let mut cash_after_reserve = vec![0.0; n];
    let mut historic_adscr = vec![0.0; n];
    let mut re_test_pass = vec![0.0; n];
    let mut npat_test_pass = vec![0.0; n];
    let mut lockup_active = vec![0.0; n];
    let mut sc_repayment = vec![0.0; n];
    let mut dividend = vec![0.0; n];

    let mut sc_balance = sc_unreturned_opening;
    let mut consecutive_passes = 0u32;

    for i in 0..n {
        cash_after_reserve[i] = (cash_available[i] - reserve_requirement[i]).max(0.0);

        let window_start = i.saturating_sub(11);
        let trailing_cfads: f64 = cfads[window_start..=i].iter().sum();
        let trailing_ds: f64 = debt_service[window_start..=i].iter().sum();
        historic_adscr[i] = safe_div(trailing_cfads, trailing_ds);

        re_test_pass[i] = if historic_adscr[i] >= re_threshold { 1.0 } else { 0.0 };
        let trailing_npat: f64 = npat[window_start..=i].iter().sum();
        npat_test_pass[i] = if trailing_npat >= 0.0 { 1.0 } else { 0.0 };

        let is_covenant_point = quarter_end_flag[i] != 0.0;
        if is_covenant_point {
            if re_test_pass[i] != 0.0 && npat_test_pass[i] != 0.0 {
                consecutive_passes += 1;
            } else {
                consecutive_passes = 0;
            }
        }
        lockup_active[i] = if (consecutive_passes as f64) < release_threshold { 1.0 } else { 0.0 };

        let distributable = if lockup_active[i] != 0.0 { 0.0 } else { cash_after_reserve[i] };

        let roc = distributable.min(sc_balance);
        sc_balance -= roc;
        let remaining = distributable - roc;
        let cap = npat[i].max(0.0);
        let div = remaining.min(cap);

        sc_repayment[i] = roc;
        dividend[i] = div;
    }

    let mut out = FxHashMap::default();
    out.insert("cashAfterReserve".to_string(), cash_after_reserve);
    out.insert("historicAdscr".to_string(), historic_adscr);
    out.insert("reTestPass".to_string(), re_test_pass);
    out.insert("npatTestPass".to_string(), npat_test_pass);
    out.insert("lockupActive".to_string(), lockup_active);
    out.insert("scRepayment".to_string(), sc_repayment);
    out.insert("dividend".to_string(), dividend);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dividends_never_exceed_period_npat() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("cfads".to_string(), json!(20.0));
        inputs.insert("debtService".to_string(), json!(10.0));
        inputs.insert("npat".to_string(), json!(5.0));
        inputs.insert("cashAvailable".to_string(), json!(50.0));
        inputs.insert("quarterEndFlag".to_string(), json!(1.0));
        inputs.insert("reThreshold".to_string(), json!(1.0));
        inputs.insert("lockupReleaseThreshold".to_string(), json!(0.0));
        let resolved = DistributionsInputs::resolve(&inputs, &ctx, 24);
        let out = calculate(&resolved, 24);
        for i in 0..24 {
            assert!(out["dividend"][i] <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn lockup_blocks_distributions_until_release_threshold_met() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("cfads".to_string(), json!(5.0));
        inputs.insert("debtService".to_string(), json!(10.0)); // ADSCR < 1, fails RE test
        inputs.insert("npat".to_string(), json!(5.0));
        inputs.insert("cashAvailable".to_string(), json!(50.0));
        inputs.insert("quarterEndFlag".to_string(), json!(1.0));
        inputs.insert("reThreshold".to_string(), json!(1.0));
        inputs.insert("lockupReleaseThreshold".to_string(), json!(4.0));
        let resolved = DistributionsInputs::resolve(&inputs, &ctx, 6);
        let out = calculate(&resolved, 6);
        assert!(out["lockupActive"].iter().all(|&x| x == 1.0));
        assert!(out["dividend"].iter().all(|&x| x == 0.0));
    }
}
