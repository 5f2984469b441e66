//! Debt-service reserve facility (§4.8): a stepped margin, a forward-looking
//! facility limit, and refi fees charged on each refinancing date.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use super::resolve::resolve_module_input_array;

/// Typed inputs for the debt-service reserve facility calculator (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct DsrfInputs {
    pub debt_service: Vec<f64>,
    pub refi_flag: Vec<f64>,
    pub margin_steps: Vec<f64>,
    pub ops_start_flag: Vec<f64>,
    pub lookforward_months: usize,
    pub refi_fee_pct: f64,
}

impl DsrfInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self {
            debt_service: inputs.get("debtService").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            refi_flag: inputs.get("refiFlag").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            margin_steps: inputs.get("marginSteps").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            ops_start_flag: inputs.get("opsStartFlag").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            lookforward_months: inputs.get("lookforwardMonths").and_then(|v| v.as_f64()).unwrap_or(12.0).round().max(1.0) as usize,
            refi_fee_pct: inputs.get("refiFeePct").and_then(|v| v.as_f64()).unwrap_or(0.0),
        }
    }
}

pub fn calculate(inputs: &DsrfInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let debt_service = &inputs.debt_service;
    let refi_flag = &inputs.refi_flag;
    let margin_steps = &inputs.margin_steps;
    let ops_start_flag = &inputs.ops_start_flag;
    let lookforward_months = inputs.lookforward_months;
    let refi_fee_pct = inputs.refi_fee_pct;

    let mut effective_margin = vec![0.0; n];
    let mut current_margin = 0.0;
    for i in 0..n {
        if margin_steps[i] != 0.0 {
            current_margin = margin_steps[i];
        }
        effective_margin[i] = current_margin;
    }

    let mut facility_limit = vec![0.0; n];
    let mut refi_fee = vec![0.0; n];
    let mut limit = 0.0;
    for i in 0..n {
        if ops_start_flag[i] != 0.0 || refi_flag[i] != 0.0 {
            let end = (i + lookforward_months).min(n);
            limit = debt_service[i..end].iter().map(|x| x.abs()).sum();
        }
        facility_limit[i] = limit;
        if refi_flag[i] != 0.0 {
            refi_fee[i] = limit * refi_fee_pct / 100.0;
        }
    }

    let mut out = FxHashMap::default();
    out.insert("effectiveMargin".to_string(), effective_margin);
    out.insert("facilityLimit".to_string(), facility_limit);
    out.insert("refiFee".to_string(), refi_fee);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn facility_limit_is_forward_sum_recomputed_on_refi() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("debtService".to_string(), json!(10.0));
        inputs.insert("opsStartFlag".to_string(), json!([1.0, 0.0, 0.0, 0.0]));
        inputs.insert("lookforwardMonths".to_string(), json!(3));
        let resolved = DsrfInputs::resolve(&inputs, &ctx, 4);
        let out = calculate(&resolved, 4);
        assert_eq!(out["facilityLimit"][0], 30.0);
        assert_eq!(out["facilityLimit"][1], 30.0);
    }

    #[test]
    fn refi_fee_charged_only_on_refi_months() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("debtService".to_string(), json!(10.0));
        inputs.insert("refiFlag".to_string(), json!([0.0, 1.0, 0.0]));
        inputs.insert("lookforwardMonths".to_string(), json!(2));
        inputs.insert("refiFeePct".to_string(), json!(1.0));
        let resolved = DsrfInputs::resolve(&inputs, &ctx, 3);
        let out = calculate(&resolved, 3);
        assert_eq!(out["refiFee"][0], 0.0);
        assert!(out["refiFee"][1] > 0.0);
        assert_eq!(out["refiFee"][2], 0.0);
    }
}
