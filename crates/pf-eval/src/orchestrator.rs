//! The engine entry point (§2.6, §6): composes the timeline, reference
//! registry, module dispatcher and formula evaluator into one pass.

use rustc_hash::{FxHashMap, FxHashSet};

use pf_common::{Diagnostic, DiagnosticCode, Ref};
use pf_model::group::Frequency;
use pf_model::{Calculation, Config, Group, Input, KeyPeriod, ModuleInstance, ReferenceRegistry, Timeline};

use crate::graph::DependencyGraph;
use crate::interpreter;
use crate::modules::debt_sizer::{self, DebtSizerInputs};
use crate::modules::dispatch::{self, module_output_order};
use crate::modules::resolve::{resolve_module_input, resolve_module_input_array};

#[derive(Debug, Clone, Default)]
pub struct EvaluationOutput {
    pub context: FxHashMap<String, Vec<f64>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Collects every ref token mentioned across calculation formulas and
/// module input values (§4.4.1) — the universe this pass must seed.
fn collect_candidate_refs(calculations: &[Calculation], modules: &[ModuleInstance]) -> FxHashSet<String> {
    let mut refs = FxHashSet::default();
    for calc in calculations {
        for r in pf_parse::extract_references(&calc.formula) {
            refs.insert(r);
        }
    }
    for module in modules {
        for value in module.inputs.values() {
            if let serde_json::Value::String(s) = value {
                let upper = s.to_ascii_uppercase();
                if upper.parse::<Ref>().is_ok() {
                    refs.insert(upper);
                }
            }
        }
    }
    refs
}

/// Seeds every `V/C/S/F/I` ref used anywhere into `ctx`, resolving via the
/// registry and recording a diagnostic for anything that doesn't resolve
/// (§3 invariants, §4.4.2).
fn seed_entity_refs(candidates: &FxHashSet<String>, registry: &ReferenceRegistry, n: usize, ctx: &mut FxHashMap<String, Vec<f64>>, diagnostics: &mut Vec<Diagnostic>) {
    for ref_str in candidates {
        let Ok(parsed) = ref_str.parse::<Ref>() else { continue };
        if matches!(parsed, Ref::Calculation { .. } | Ref::Module { .. }) {
            continue;
        }
        match registry.resolve(&parsed) {
            Some(arr) => {
                ctx.insert(ref_str.clone(), arr);
            }
            None => {
                ctx.insert(ref_str.clone(), vec![0.0; n]);
                diagnostics.push(
                    Diagnostic::error(DiagnosticCode::UnresolvedReference, format!("unresolved reference {ref_str}")).with_ref(ref_str.clone()),
                );
            }
        }
    }
}

/// Flags any `R{id}` ref mentioned in a formula that names no declared
/// `Calculation` — a dangling forward reference (§3: "unresolved refs yield
/// a zero array *and* a diagnostic, never silent NaN"). Nodes that exist as
/// a `Calculation` but sit in a cycle are handled separately by the graph's
/// own `CircularDependency` diagnostic, not here.
fn diagnose_dangling_calc_refs(
    candidates: &FxHashSet<String>,
    calc_by_ref: &FxHashMap<String, &Calculation>,
    n: usize,
    ctx: &mut FxHashMap<String, Vec<f64>>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for ref_str in candidates {
        let Ok(parsed) = ref_str.parse::<Ref>() else { continue };
        if !matches!(parsed, Ref::Calculation { .. }) || calc_by_ref.contains_key(ref_str) {
            continue;
        }
        ctx.entry(ref_str.clone()).or_insert_with(|| {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::UnresolvedReference, format!("unresolved reference {ref_str}")).with_ref(ref_str.clone()),
            );
            vec![0.0; n]
        });
    }
}

/// Fills any `M{id}.{k}` ref mentioned in a formula but never written by a
/// module run (unknown instance, disabled module, or out-of-range output
/// index) with a zero array plus diagnostic.
fn backfill_missing_module_refs(candidates: &FxHashSet<String>, n: usize, ctx: &mut FxHashMap<String, Vec<f64>>, diagnostics: &mut Vec<Diagnostic>) {
    for ref_str in candidates {
        let Ok(parsed) = ref_str.parse::<Ref>() else { continue };
        if !matches!(parsed, Ref::Module { .. }) {
            continue;
        }
        ctx.entry(ref_str.clone()).or_insert_with(|| {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::UnresolvedReference, format!("unresolved module output {ref_str}")).with_ref(ref_str.clone()),
            );
            vec![0.0; n]
        });
    }
}

fn parse_debt_period(modules_input: Option<&serde_json::Value>) -> Frequency {
    match modules_input.and_then(|v| v.as_str()) {
        Some("M") => Frequency::M,
        Some("Y") | Some("FY") => Frequency::Y,
        _ => Frequency::Q,
    }
}

/// Runs the debt sizer instances (kept separate from [`dispatch::dispatch_all`]
/// because sizing needs the [`Timeline`], not just the flat context).
fn run_debt_sizers(modules: &[ModuleInstance], timeline: &Timeline, ctx: &mut FxHashMap<String, Vec<f64>>, diagnostics: &mut Vec<Diagnostic>) {
    let n = timeline.n;
    for instance in modules {
        if !instance.enabled || instance.module_type != "debtSizer" {
            continue;
        }
        dispatch::validate_input_keys(&instance.module_type, instance.id, &instance.inputs, diagnostics);

        let get = |key: &str| instance.inputs.get(key);
        // §4.7 step 1: a legacy single-CFADS path (one CFADS series over one
        // DSCR) is accepted as an alternative to the contracted/merchant
        // split — only engaged when both `cfads` and `dscr` are supplied.
        let legacy_cfads = get("cfads").map(|v| resolve_module_input_array(v, ctx, n, 0.0));
        let legacy_dscr = get("dscr").map(|v| resolve_module_input(v, ctx, 1.0));
        let inputs = DebtSizerInputs {
            contracted_cfads: get("contractedCfads").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            merchant_cfads: get("merchantCfads").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            contracted_dscr: get("contractedDscr").map(|v| resolve_module_input(v, ctx, 1.0)).unwrap_or(1.0),
            merchant_dscr: get("merchantDscr").map(|v| resolve_module_input(v, ctx, 1.0)).unwrap_or(1.0),
            legacy_cfads,
            legacy_dscr,
            debt_flag: get("debtFlag").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            cumulative_funding: get("cumulativeFunding").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            max_gearing_pct: get("maxGearingPct").map(|v| resolve_module_input(v, ctx, 100.0)).unwrap_or(100.0),
            interest_rate_pct: get("interestRate").map(|v| resolve_module_input_array(v, ctx, n, 0.0)).unwrap_or_else(|| vec![0.0; n]),
            tenor_years: get("tenorYears").map(|v| resolve_module_input(v, ctx, 1.0)).unwrap_or(1.0),
            debt_period: parse_debt_period(get("debtPeriod")),
            tolerance: get("tolerance").and_then(|v| v.as_f64()).unwrap_or(0.01),
            max_iterations: get("maxIterations").and_then(|v| v.as_f64()).map(|x| x.round() as u32).unwrap_or(60),
        };

        let outcome = debt_sizer::size_debt(timeline, &inputs);
        if !outcome.solver_log.converged {
            diagnostics.push(
                Diagnostic::warning(DiagnosticCode::SolverDidNotConverge, "debt sizer found no viable debt")
                    .with_ref(format!("M{}", instance.id))
                    .with_context(serde_json::json!({
                        "iterations": outcome.solver_log.iterations,
                        "maxGearingCap": outcome.solver_log.max_gearing_cap,
                    })),
            );
        }

        let order = module_output_order("debtSizer").expect("debtSizer output order is registered");
        let arrays = [
            outcome.outputs.sized_debt,
            outcome.outputs.opening_balance,
            outcome.outputs.interest_payment,
            outcome.outputs.principal_payment,
            outcome.outputs.debt_service,
            outcome.outputs.closing_balance,
            outcome.outputs.period_dscr,
            outcome.outputs.cumulative_principal,
        ];
        for (k, (_, arr)) in order.iter().zip(arrays.into_iter()).enumerate() {
            ctx.insert(format!("M{}.{}", instance.id, k + 1), arr);
        }
    }
}

/// Evaluates a full model in one pass (§2.6, §6). Returns an empty context
/// only when the config itself is invalid (§7) — every other failure mode
/// degrades individual outputs and is recorded in `diagnostics`.
pub fn evaluate(
    config: &Config,
    groups: &[Group],
    inputs: &[Input],
    _key_periods: &[KeyPeriod],
    calculations: &[Calculation],
    modules: &[ModuleInstance],
) -> EvaluationOutput {
    let mut diagnostics = Vec::new();

    let timeline = match Timeline::from_config(config) {
        Ok(t) => t,
        Err(err) => {
            diagnostics.push(Diagnostic::error(DiagnosticCode::ConfigError, err.to_string()));
            return EvaluationOutput {
                context: FxHashMap::default(),
                diagnostics,
            };
        }
    };
    let n = timeline.n;

    let registry = ReferenceRegistry::new(config, &timeline, groups, inputs);
    let candidates = collect_candidate_refs(calculations, modules);

    let mut ctx: FxHashMap<String, Vec<f64>> = FxHashMap::default();
    seed_entity_refs(&candidates, &registry, n, &mut ctx, &mut diagnostics);

    run_debt_sizers(modules, &timeline, &mut ctx, &mut diagnostics);
    dispatch::dispatch_all(modules, &mut ctx, n, &mut diagnostics);
    backfill_missing_module_refs(&candidates, n, &mut ctx, &mut diagnostics);

    let graph = DependencyGraph::build(calculations);
    let (order, cyclic, mut cycle_diags) = graph.topological_order();
    diagnostics.append(&mut cycle_diags);

    let calc_by_ref: FxHashMap<String, &Calculation> = calculations.iter().map(|c| (c.reference(), c)).collect();
    diagnose_dangling_calc_refs(&candidates, &calc_by_ref, n, &mut ctx, &mut diagnostics);

    for ref_name in &cyclic {
        ctx.insert(ref_name.clone(), vec![0.0; n]);
    }

    for ref_name in &order {
        let Some(calc) = calc_by_ref.get(ref_name) else { continue };
        let result = interpreter::evaluate_formula(&calc.formula, &ctx, n, ref_name, &mut diagnostics);
        ctx.insert(ref_name.clone(), result);
    }

    EvaluationOutput { context: ctx, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_model::group::{EntryMode, SpreadMethod};
    use rustc_hash::FxHashMap as Map;

    fn base_config(n_months: u32) -> Config {
        Config {
            start_year: 2024,
            start_month: 1,
            end_year: 2024 + (n_months as i32 - 1) / 12,
            end_month: ((n_months - 1) % 12) + 1,
            fy_start_month: 1,
            prefill_lookups: false,
            default_spread_method: SpreadMethod::Lookup,
        }
    }

    fn values_group(id: u32) -> Group {
        Group {
            id,
            name: "g".into(),
            entry_mode: EntryMode::Values,
            frequency: Frequency::M,
            linked_key_period_id: None,
            start_year: None,
            start_month: None,
            periods: None,
            lookup_start: None,
            lookup_end: None,
            subgroups: vec![],
            selected_indices: Map::default(),
            show_selected: false,
        }
    }

    fn values_input(id: u32, group_id: u32, monthly: f64, n: usize) -> Input {
        let mut values = Map::default();
        for i in 0..n {
            values.insert(i, monthly);
        }
        Input {
            id,
            group_id,
            subgroup_id: None,
            name: format!("i{id}"),
            ref_name: None,
            value: None,
            spread_method: None,
            values,
            series_annual_value: None,
            series_frequency: None,
            series_payment_month: None,
            series_start_date: None,
            series_end_date: None,
            series_range_end: false,
        }
    }

    fn calc(id: u32, formula: &str) -> Calculation {
        Calculation {
            id,
            ref_name: None,
            name: format!("c{id}"),
            formula: formula.to_string(),
        }
    }

    #[test]
    fn seed_scenario_one_simple_multiplication() {
        let n = 12;
        let cfg = base_config(n);
        let groups = vec![values_group(1)];
        let inputs = vec![values_input(1, 1, 10.0, n as usize)];
        let calcs = vec![calc(1, "V1*2")];
        let out = evaluate(&cfg, &groups, &inputs, &[], &calcs, &[]);
        assert_eq!(out.context["R1"], vec![20.0; n as usize]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn seed_scenario_six_cycle_detection() {
        let cfg = base_config(6);
        let calcs = vec![calc(1, "R2+1"), calc(2, "R1+1")];
        let out = evaluate(&cfg, &[], &[], &[], &calcs, &[]);
        assert_eq!(out.context["R1"], vec![0.0; 6]);
        assert_eq!(out.context["R2"], vec![0.0; 6]);
        assert_eq!(out.diagnostics.iter().filter(|d| d.code == DiagnosticCode::CircularDependency).count(), 1);
    }

    #[test]
    fn fatal_config_error_returns_empty_context() {
        let mut cfg = base_config(12);
        cfg.end_year = 2020;
        let out = evaluate(&cfg, &[], &[], &[], &[], &[]);
        assert!(out.context.is_empty());
        assert!(out.diagnostics.iter().any(|d| d.code == DiagnosticCode::ConfigError));
    }

    #[test]
    fn dangling_calc_ref_zeros_and_diagnoses() {
        let cfg = base_config(4);
        let calcs = vec![calc(1, "R99 + 1")];
        let out = evaluate(&cfg, &[], &[], &[], &calcs, &[]);
        assert_eq!(out.context["R1"], vec![1.0; 4]);
        assert_eq!(out.context["R99"], vec![0.0; 4]);
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UnresolvedReference && d.ref_name.as_deref() == Some("R99")));
    }

    #[test]
    fn topological_order_is_independent_of_declaration_order() {
        let n = 4;
        let cfg = base_config(n);
        let calcs_a = vec![calc(1, "R2+1"), calc(2, "2")];
        let calcs_b = vec![calc(2, "2"), calc(1, "R2+1")];
        let out_a = evaluate(&cfg, &[], &[], &[], &calcs_a, &[]);
        let out_b = evaluate(&cfg, &[], &[], &[], &calcs_b, &[]);
        assert_eq!(out_a.context["R1"], out_b.context["R1"]);
        assert_eq!(out_a.context["R1"], vec![3.0; n as usize]);
    }
}
