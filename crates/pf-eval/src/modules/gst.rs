//! GST receivable (§4.8): a closed-form CUMSUM forward pass — GST paid on
//! costs accrues as a receivable until refunded, net balance is a running
//! stock.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use super::resolve::resolve_module_input_array;

/// Typed inputs for the GST receivable calculator (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct GstInputs {
    pub gst_paid: Vec<f64>,
    pub gst_refunded: Vec<f64>,
}

impl GstInputs {
    pub fn resolve(inputs: &FxHashMap<String, Json>, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self {
            gst_paid: inputs.get("gstPaid").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            gst_refunded: inputs.get("gstRefunded").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
        }
    }
}

pub fn calculate(inputs: &GstInputs, n: usize) -> FxHashMap<String, Vec<f64>> {
    let gst_paid = &inputs.gst_paid;
    let gst_refunded = &inputs.gst_refunded;

    let mut net_movement = vec![0.0; n];
    let mut receivable_balance = vec![0.0; n];
    let mut balance = 0.0;
    for i in 0..n {
        net_movement[i] = gst_paid[i] - gst_refunded[i];
        balance += net_movement[i];
        receivable_balance[i] = balance;
    }

    let mut out = FxHashMap::default();
    out.insert("netMovement".to_string(), net_movement);
    out.insert("receivableBalance".to_string(), receivable_balance);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn receivable_balance_is_cumulative_net_movement() {
        let ctx = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        inputs.insert("gstPaid".to_string(), json!([10.0, 10.0, 0.0]));
        inputs.insert("gstRefunded".to_string(), json!([0.0, 0.0, 20.0]));
        let resolved = GstInputs::resolve(&inputs, &ctx, 3);
        let out = calculate(&resolved, 3);
        assert_eq!(out["receivableBalance"], vec![10.0, 20.0, 0.0]);
    }
}
