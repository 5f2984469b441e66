//! The array-semantics function library (§4.4.4). Every function accepts
//! arrays and/or scalars; broadcasting is handled centrally in
//! [`pf_common::Value`].

use pf_common::value::safe_div;
use pf_common::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionError {
    #[error("unknown function {0}")]
    Unknown(String),
    #[error("{0} expects at least {1} argument(s), got {2}")]
    Arity(String, usize, usize),
}

fn require_arity(name: &str, args: &[Value], min: usize) -> Result<(), FunctionError> {
    if args.len() < min {
        return Err(FunctionError::Arity(name.to_string(), min, args.len()));
    }
    Ok(())
}

fn round_half_away_from_zero(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = x * factor;
    let rounded = if scaled >= 0.0 { (scaled + 0.5).floor() } else { (scaled - 0.5).ceil() };
    rounded / factor
}

fn shift_right(arr: &[f64], k: usize) -> Vec<f64> {
    let len = arr.len();
    let mut out = vec![0.0; len];
    if k < len {
        for i in k..len {
            out[i] = arr[i - k];
        }
    }
    out
}

fn shift_left(arr: &[f64], k: usize) -> Vec<f64> {
    let len = arr.len();
    let mut out = vec![0.0; len];
    if k < len {
        for i in 0..(len - k) {
            out[i] = arr[i + k];
        }
    }
    out
}

fn min_max(name: &str, args: &[Value], n: usize, want_min: bool) -> Result<Value, FunctionError> {
    require_arity(name, args, 1)?;
    if args.len() == 1 {
        let arr = args[0].to_array(n);
        let reduced = if want_min {
            arr.iter().copied().fold(f64::INFINITY, f64::min)
        } else {
            arr.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        };
        return Ok(Value::Scalar(reduced));
    }
    if args.iter().all(|a| matches!(a, Value::Scalar(_))) {
        let reduced = args
            .iter()
            .map(|a| a.as_scalar().unwrap())
            .fold(if want_min { f64::INFINITY } else { f64::NEG_INFINITY }, |acc, x| {
                if want_min {
                    acc.min(x)
                } else {
                    acc.max(x)
                }
            });
        return Ok(Value::Scalar(reduced));
    }
    let arrays: Vec<Vec<f64>> = args.iter().map(|a| a.to_array(n)).collect();
    let mut out = vec![if want_min { f64::INFINITY } else { f64::NEG_INFINITY }; n];
    for arr in &arrays {
        for i in 0..n {
            out[i] = if want_min { out[i].min(arr[i]) } else { out[i].max(arr[i]) };
        }
    }
    Ok(Value::Series(out))
}

fn cmp(name: &str, args: &[Value], n: usize, op: impl Fn(f64, f64) -> bool) -> Result<Value, FunctionError> {
    require_arity(name, args, 2)?;
    Ok(args[0].zip_with(&args[1], n, move |a, b| if op(a, b) { 1.0 } else { 0.0 }))
}

/// Dispatches a function call by (uppercased) name (§4.4.4).
pub fn call(name: &str, args: &[Value], n: usize) -> Result<Value, FunctionError> {
    match name {
        "LAG" => {
            require_arity(name, args, 2)?;
            let arr = args[0].to_array(n);
            let k = args[1].as_scalar().unwrap_or(0.0).round().max(0.0) as usize;
            Ok(Value::Series(shift_right(&arr, k)))
        }
        "LEAD" => {
            require_arity(name, args, 2)?;
            let arr = args[0].to_array(n);
            let k = args[1].as_scalar().unwrap_or(0.0).round().max(0.0) as usize;
            Ok(Value::Series(shift_left(&arr, k)))
        }
        "MIN" => min_max(name, args, n, true),
        "MAX" => min_max(name, args, n, false),
        "SUM" => {
            require_arity(name, args, 1)?;
            let arr = args[0].to_array(n);
            Ok(Value::Scalar(arr.iter().sum()))
        }
        "AVG" => {
            require_arity(name, args, 1)?;
            let arr = args[0].to_array(n);
            let avg = if arr.is_empty() { 0.0 } else { arr.iter().sum::<f64>() / arr.len() as f64 };
            Ok(Value::Scalar(avg))
        }
        "ABS" => {
            require_arity(name, args, 1)?;
            Ok(args[0].map(f64::abs))
        }
        "ROUND" => {
            require_arity(name, args, 1)?;
            let decimals = args.get(1).and_then(|v| v.as_scalar()).unwrap_or(0.0).round() as i32;
            Ok(args[0].map(|x| round_half_away_from_zero(x, decimals)))
        }
        "CUMSUM" => {
            require_arity(name, args, 1)?;
            let arr = args[0].to_array(n);
            let mut acc = 0.0;
            let out: Vec<f64> = arr
                .into_iter()
                .map(|x| {
                    acc += x;
                    acc
                })
                .collect();
            Ok(Value::Series(out))
        }
        "CUMPROD" => {
            require_arity(name, args, 1)?;
            let arr = args[0].to_array(n);
            let mut acc = 1.0;
            let out: Vec<f64> = arr
                .into_iter()
                .map(|x| {
                    acc *= x;
                    acc
                })
                .collect();
            Ok(Value::Series(out))
        }
        "IF" => {
            require_arity(name, args, 3)?;
            let cond = args[0].to_array(n);
            let t = args[1].to_array(n);
            let e = args[2].to_array(n);
            let out: Vec<f64> = (0..n).map(|i| if cond[i] != 0.0 { t[i] } else { e[i] }).collect();
            Ok(Value::Series(out))
        }
        "GT" => cmp(name, args, n, |a, b| a > b),
        "GTE" => cmp(name, args, n, |a, b| a >= b),
        "LT" => cmp(name, args, n, |a, b| a < b),
        "LTE" => cmp(name, args, n, |a, b| a <= b),
        "EQ" => cmp(name, args, n, |a, b| a == b),
        "NEQ" => cmp(name, args, n, |a, b| a != b),
        "AND" => {
            require_arity(name, args, 2)?;
            Ok(args[0].zip_with(&args[1], n, |a, b| if a != 0.0 && b != 0.0 { 1.0 } else { 0.0 }))
        }
        "OR" => {
            require_arity(name, args, 2)?;
            Ok(args[0].zip_with(&args[1], n, |a, b| if a != 0.0 || b != 0.0 { 1.0 } else { 0.0 }))
        }
        "NOT" => {
            require_arity(name, args, 1)?;
            Ok(args[0].map(|a| if a == 0.0 { 1.0 } else { 0.0 }))
        }
        _ => Err(FunctionError::Unknown(name.to_string())),
    }
}

/// Safe division used by the `/` operator (§4.4.3): division by zero
/// yields `0.0`, not `NaN`/`Inf`.
pub fn divide(a: &Value, b: &Value, n: usize) -> Value {
    a.zip_with(b, n, safe_div)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lag_shifts_right_filling_zero() {
        let arr = Value::Series(vec![1.0, 2.0, 3.0, 4.0]);
        let out = call("LAG", &[arr, Value::Scalar(1.0)], 4).unwrap();
        assert_eq!(out, Value::Series(vec![0.0, 1.0, 2.0, 3.0]));
    }

    #[test]
    fn lead_shifts_left_filling_zero() {
        let arr = Value::Series(vec![1.0, 2.0, 3.0, 4.0]);
        let out = call("LEAD", &[arr, Value::Scalar(1.0)], 4).unwrap();
        assert_eq!(out, Value::Series(vec![2.0, 3.0, 4.0, 0.0]));
    }

    #[test]
    fn cumsum_of_constant_one_is_linear() {
        let out = call("CUMSUM", &[Value::Series(vec![1.0; 24])], 24).unwrap();
        if let Value::Series(v) = out {
            assert_eq!(v[23], 24.0);
        } else {
            panic!("expected series");
        }
    }

    #[test]
    fn cumprod_of_scalar_injects_evaluation_length() {
        let out = call("CUMPROD", &[Value::Scalar(1.01)], 36).unwrap();
        if let Value::Series(v) = out {
            assert!((v[0] - 1.01).abs() < 1e-9);
            assert!((v[11] - 1.1268250301f64).abs() < 1e-6);
        } else {
            panic!("expected series");
        }
    }

    #[test]
    fn min_max_single_array_reduces_to_scalar() {
        let out = call("MIN", &[Value::Series(vec![3.0, 1.0, 2.0])], 3).unwrap();
        assert_eq!(out, Value::Scalar(1.0));
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(round_half_away_from_zero(2.5, 0), 3.0);
        assert_eq!(round_half_away_from_zero(-2.5, 0), -3.0);
        assert_eq!(round_half_away_from_zero(1.005, 2), 1.01);
    }

    #[test]
    fn unknown_function_is_an_error() {
        assert!(matches!(call("BOGUS", &[], 1), Err(FunctionError::Unknown(_))));
    }
}
