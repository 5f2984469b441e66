//! The array-semantics evaluator (§4.4.3): a formula AST evaluates to
//! either a scalar or a length-`N` array against a shared context map. The
//! evaluator has no hidden state — re-evaluating with the same context must
//! yield identical bytes.

use rustc_hash::FxHashMap;
use serde_json::json;
use thiserror::Error;

use pf_common::{Diagnostic, DiagnosticCode, Value};
use pf_parse::{ast::BinOp, Expr, ParseError, Parser};

use crate::functions::{self, FunctionError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Function(#[from] FunctionError),
}

pub struct Evaluator<'a> {
    ctx: &'a FxHashMap<String, Vec<f64>>,
    n: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a FxHashMap<String, Vec<f64>>, n: usize) -> Self {
        Self { ctx, n }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(x) => Ok(Value::Scalar(*x)),
            Expr::Ref(name) => Ok(Value::Series(self.ctx.get(name).cloned().unwrap_or_else(|| vec![0.0; self.n]))),
            Expr::Neg(inner) => Ok(self.eval(inner)?.map(|x| -x)),
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                Ok(match op {
                    BinOp::Add => l.zip_with(&r, self.n, |a, b| a + b),
                    BinOp::Sub => l.zip_with(&r, self.n, |a, b| a - b),
                    BinOp::Mul => l.zip_with(&r, self.n, |a, b| a * b),
                    BinOp::Div => functions::divide(&l, &r, self.n),
                    BinOp::Pow => l.zip_with(&r, self.n, |a, b| a.powf(b)),
                })
            }
            Expr::Call(name, args) => {
                let values = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                Ok(functions::call(name, &values, self.n)?)
            }
        }
    }
}

/// Parses and evaluates one calculation's formula against `ctx`. Never
/// fails: syntax errors, unknown references (already zeroed in `ctx` by the
/// orchestrator) and runtime errors (unknown function, arity mismatch) all
/// degrade to a zero array plus a pushed [`Diagnostic`] (§4.4.5, §7).
pub fn evaluate_formula(
    formula: &str,
    ctx: &FxHashMap<String, Vec<f64>>,
    n: usize,
    ref_name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<f64> {
    let expr = match Parser::parse_formula(formula) {
        Ok(e) => e,
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::FormulaSyntaxError, e.to_string())
                    .with_ref(ref_name.to_string())
                    .with_context(json!({ "formula": formula })),
            );
            return vec![0.0; n];
        }
    };

    let evaluator = Evaluator::new(ctx, n);
    match evaluator.eval(&expr) {
        Ok(v) => v.to_array(n),
        Err(EvalError::Function(FunctionError::Unknown(name))) => {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::UnknownFunction, format!("unknown function {name}"))
                    .with_ref(ref_name.to_string())
                    .with_context(json!({ "formula": formula })),
            );
            vec![0.0; n]
        }
        Err(EvalError::Function(err @ FunctionError::Arity(..))) => {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::ArityMismatch, err.to_string())
                    .with_ref(ref_name.to_string())
                    .with_context(json!({ "formula": formula })),
            );
            vec![0.0; n]
        }
    }
}

/// Validation (§4.4.6): empty formula, unknown references against the
/// currently available ref set, and obvious syntax issues, checked by
/// substituting every extracted ref with `1` and attempting a parse.
pub fn validate_formula(formula: &str, available_refs: &std::collections::HashSet<String>) -> Vec<String> {
    let mut problems = Vec::new();
    if formula.trim().is_empty() {
        problems.push("empty formula".to_string());
        return problems;
    }

    let refs = pf_parse::extract_references(formula);
    for r in &refs {
        if !available_refs.contains(r) {
            problems.push(format!("unknown reference {r}"));
        }
    }

    // Replace longest refs first: `R1` is a substring of `R10`, so replacing
    // the shorter one first would mangle the longer one mid-string before
    // its own turn comes up.
    let mut by_length = refs.clone();
    by_length.sort_unstable_by_key(|r| std::cmp::Reverse(r.len()));
    let mut probe = formula.to_string();
    for r in &by_length {
        probe = probe.replace(r.as_str(), "1");
    }
    if let Err(e) = Parser::parse_formula(&probe) {
        problems.push(format!("syntax error: {e}"));
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(pairs: &[(&str, Vec<f64>)]) -> FxHashMap<String, Vec<f64>> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn evaluates_simple_arithmetic_over_values_ref() {
        let ctx = ctx_with(&[("V1", vec![10.0; 12])]);
        let mut diags = Vec::new();
        let out = evaluate_formula("V1*2", &ctx, 12, "R1", &mut diags);
        assert_eq!(out, vec![20.0; 12]);
        assert!(diags.is_empty());
    }

    #[test]
    fn syntax_error_degrades_to_zero_with_diagnostic() {
        let ctx = FxHashMap::default();
        let mut diags = Vec::new();
        let out = evaluate_formula("V1 + ", &ctx, 4, "R1", &mut diags);
        assert_eq!(out, vec![0.0; 4]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::FormulaSyntaxError);
    }

    #[test]
    fn unknown_function_degrades_to_zero_with_diagnostic() {
        let ctx = FxHashMap::default();
        let mut diags = Vec::new();
        let out = evaluate_formula("NOPE(1)", &ctx, 4, "R1", &mut diags);
        assert_eq!(out, vec![0.0; 4]);
        assert_eq!(diags[0].code, DiagnosticCode::UnknownFunction);
    }

    #[test]
    fn validate_formula_handles_refs_with_shared_numeric_prefixes() {
        let mut available = std::collections::HashSet::new();
        available.insert("R1".to_string());
        available.insert("R10".to_string());
        let problems = validate_formula("R1+R10", &available);
        assert!(problems.is_empty());
    }

    #[test]
    fn division_by_zero_is_zero_not_nan() {
        let ctx = ctx_with(&[("V1", vec![0.0; 4])]);
        let mut diags = Vec::new();
        let out = evaluate_formula("5/V1", &ctx, 4, "R1", &mut diags);
        assert_eq!(out, vec![0.0; 4]);
        assert!(out.iter().all(|x| x.is_finite()));
    }
}
