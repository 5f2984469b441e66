//! Module input resolver utilities (§4.6).

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

/// Resolves a module input declared as `number_or_ref` to a single scalar.
pub fn resolve_module_input(value: &Json, ctx: &FxHashMap<String, Vec<f64>>, default: f64) -> f64 {
    match value {
        Json::Number(n) => n.as_f64().unwrap_or(default),
        Json::String(s) => {
            if let Some(arr) = ctx.get(s) {
                arr.iter().copied().find(|x| *x != 0.0).unwrap_or_else(|| arr.first().copied().unwrap_or(default))
            } else if let Ok(parsed) = s.parse::<f64>() {
                parsed
            } else {
                default
            }
        }
        _ => default,
    }
}

/// Resolves a module input to a length-`n` array: a referenced array is
/// returned as-is, a bare number is broadcast, anything else defaults.
pub fn resolve_module_input_array(value: &Json, ctx: &FxHashMap<String, Vec<f64>>, n: usize, default: f64) -> Vec<f64> {
    match value {
        Json::String(s) => ctx.get(s).cloned().unwrap_or_else(|| vec![default; n]),
        Json::Number(num) => vec![num.as_f64().unwrap_or(default); n],
        _ => vec![default; n],
    }
}
