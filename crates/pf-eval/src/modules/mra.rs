//! Maintenance reserve account (§4.8): sized by a look-forward sum of
//! upcoming maintenance capex; required top-up/release is the delta
//! against the opening balance.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use super::resolve::resolve_module_input_array;

/// Typed inputs for the maintenance reserve account calculator (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct MraInputs {
    pub maintenance_capex: Vec<f64>,
    pub lookforward_months: usize,
}

impl MraInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self {
            maintenance_capex: inputs.get("maintenanceCapex").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            lookforward_months: inputs.get("lookforwardMonths").and_then(|v| v.as_f64()).unwrap_or(12.0).round().max(1.0) as usize,
        }
    }
}

pub fn calculate(inputs: &MraInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let maintenance_capex = &inputs.maintenance_capex;
    let lookforward_months = inputs.lookforward_months;

    let mut required_balance = vec![0.0; n];
    for i in 0..n {
        let end = (i + lookforward_months).min(n);
        required_balance[i] = maintenance_capex[i..end].iter().sum();
    }

    let mut movement = vec![0.0; n];
    let mut closing_balance = vec![0.0; n];
    let mut prev = 0.0;
    for i in 0..n {
        movement[i] = required_balance[i] - prev;
        closing_balance[i] = required_balance[i];
        prev = required_balance[i];
    }

    let mut out = FxHashMap::default();
    out.insert("requiredBalance".to_string(), required_balance);
    out.insert("movement".to_string(), movement);
    out.insert("closingBalance".to_string(), closing_balance);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_balance_is_forward_looking_sum() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("maintenanceCapex".to_string(), json!([0.0, 0.0, 30.0, 0.0]));
        inputs.insert("lookforwardMonths".to_string(), json!(3));
        let resolved = MraInputs::resolve(&inputs, &ctx, 4);
        let out = calculate(&resolved, 4);
        assert_eq!(out["requiredBalance"][0], 30.0);
        assert_eq!(out["requiredBalance"][1], 30.0);
        assert_eq!(out["requiredBalance"][3], 0.0);
    }
}
