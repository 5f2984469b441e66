//! Construction funding waterfall (§4.8). `fullyConverted` in the source
//! template — declared calculations drive most outputs — but the sizing
//! step (senior debt capped by the gearing ceiling) stays a module
//! calculator since it reaches into `sizedDebt` and a cumulative-cost ref.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use super::resolve::{resolve_module_input, resolve_module_input_array};

/// Typed inputs for the construction funding calculator (§4.6, §4.8),
/// resolved once from the raw `ModuleInstance.inputs` map.
#[derive(Debug, Clone)]
pub struct ConstructionFundingInputs {
    pub costs: Vec<f64>,
    pub gst_paid: Vec<f64>,
    pub fees: Vec<f64>,
    pub construction_flag: Vec<f64>,
    pub sized_debt: f64,
    pub gearing_cap: f64,
    pub monthly_rate_pct: f64,
}

impl ConstructionFundingInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self {
            costs: inputs.get("costs").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            gst_paid: inputs.get("gstPaid").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            fees: inputs.get("fees").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            construction_flag: inputs
                .get("constructionFlag")
                .map(|v| resolve_module_input_array(v, ctx, n, 1.0))
                .unwrap_or_else(|| vec![1.0; n]),
            sized_debt: inputs.get("sizedDebt").map(|v| resolve_module_input(v, ctx, 0.0)).unwrap_or(0.0),
            gearing_cap: inputs.get("gearingCap").map(|v| resolve_module_input(v, ctx, 100.0)).unwrap_or(100.0),
            monthly_rate_pct: inputs.get("interestRate").map(|v| resolve_module_input(v, ctx, 0.0)).unwrap_or(0.0),
        }
    }
}

pub fn calculate(inputs: &ConstructionFundingInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let costs = &inputs.costs;
    let gst_paid = &inputs.gst_paid;
    let fees = &inputs.fees;
    let construction_flag = &inputs.construction_flag;
    let sized_debt = inputs.sized_debt;
    let gearing_cap = inputs.gearing_cap;
    let monthly_rate_pct = inputs.monthly_rate_pct;

    let mut total_uses_period = vec![0.0; n];
    for i in 0..n {
        total_uses_period[i] = (costs[i] + gst_paid[i] + fees[i]) * construction_flag[i];
    }
    let mut total_uses = vec![0.0; n];
    let mut acc = 0.0;
    for i in 0..n {
        acc += total_uses_period[i];
        total_uses[i] = acc;
    }

    let senior_debt: Vec<f64> = (0..n).map(|i| sized_debt.min(total_uses[i] * gearing_cap / 100.0)).collect();
    let gearing_pct: Vec<f64> = (0..n).map(|i| pf_common::value::safe_div(senior_debt[i], total_uses[i]) * 100.0).collect();

    let mut idc = vec![0.0; n];
    let mut opening_debt = vec![0.0; n];
    let mut drawn = 0.0;
    for i in 0..n {
        opening_debt[i] = drawn;
        idc[i] = drawn * monthly_rate_pct / 100.0 / 12.0 * construction_flag[i];
        let draw = (senior_debt[i] - drawn).max(0.0) * construction_flag[i];
        drawn += draw;
    }

    let equity_drawdown: Vec<f64> = (0..n).map(|i| (total_uses_period[i] + idc[i] - (senior_debt[i] - opening_debt[i])).max(0.0)).collect();

    let mut out = FxHashMap::default();
    out.insert("totalUses".to_string(), total_uses);
    out.insert("seniorDebt".to_string(), senior_debt);
    out.insert("gearingPct".to_string(), gearing_pct);
    out.insert("idc".to_string(), idc);
    out.insert("equityDrawdown".to_string(), equity_drawdown);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn senior_debt_never_exceeds_sized_debt_or_gearing_cap() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("costs".to_string(), json!(100.0));
        inputs.insert("sizedDebt".to_string(), json!(1000.0));
        inputs.insert("gearingCap".to_string(), json!(65.0));
        let resolved = ConstructionFundingInputs::resolve(&inputs, &ctx, 12);
        let out = calculate(&resolved, 12);
        let senior = &out["seniorDebt"];
        let uses = &out["totalUses"];
        for i in 0..12 {
            assert!(senior[i] <= 1000.0 + 1e-9);
            assert!(senior[i] <= uses[i] * 0.65 + 1e-9);
        }
    }

    #[test]
    fn construction_flag_zero_halts_drawdown() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("costs".to_string(), json!(100.0));
        inputs.insert("constructionFlag".to_string(), json!(0.0));
        inputs.insert("sizedDebt".to_string(), json!(1000.0));
        let resolved = ConstructionFundingInputs::resolve(&inputs, &ctx, 6);
        let out = calculate(&resolved, 6);
        assert_eq!(out["idc"], vec![0.0; 6]);
    }
}
