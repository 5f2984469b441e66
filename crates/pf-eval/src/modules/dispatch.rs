//! The module dispatcher (§4.5): invokes the calculator registered for a
//! `ModuleInstance`'s `moduleType` and writes its outputs into the
//! evaluation context under `M{instanceId}.{k}`, `k` being the 1-indexed
//! position of that output key in the module's declared output list.

use rustc_hash::FxHashMap;
use serde_json::Value as Json;

use pf_common::{Diagnostic, DiagnosticCode};
use pf_model::ModuleInstance;

use super::{amortisation, construction_funding, distributions, dsrf, gst, mra};

/// Declared output order per module type (§4.5 "output schema"). Drives the
/// `k` in `M{instanceId}.{k}`; unlisted module types are unknown.
fn output_order(module_type: &str) -> Option<&'static [&'static str]> {
    match module_type {
        "debtSizer" => Some(&[
            "sized_debt",
            "opening_balance",
            "interest_payment",
            "principal_payment",
            "debt_service",
            "closing_balance",
            "period_dscr",
            "cumulative_principal",
        ]),
        "constructionFunding" => Some(&["totalUses", "seniorDebt", "gearingPct", "idc", "equityDrawdown"]),
        "distributions" => Some(&[
            "cashAfterReserve",
            "historicAdscr",
            "reTestPass",
            "npatTestPass",
            "lockupActive",
            "scRepayment",
            "dividend",
        ]),
        "dsrf" => Some(&["effectiveMargin", "facilityLimit", "refiFee"]),
        "gstReceivable" => Some(&["netMovement", "receivableBalance"]),
        "mraReserve" => Some(&["requiredBalance", "movement", "closingBalance"]),
        "amortisation" => Some(&["opening", "additions", "expense", "closing"]),
        _ => None,
    }
}

fn run_calculator(module_type: &str, instance: &ModuleInstance, ctx: &FxHashMap<String, Vec<f64>>, n: usize) -> Option<FxHashMap<String, Vec<f64>>> {
    match module_type {
        "constructionFunding" => Some(construction_funding::calculate(&construction_funding::ConstructionFundingInputs::resolve(&instance.inputs, ctx, n), n)),
        "distributions" => Some(distributions::calculate(&distributions::DistributionsInputs::resolve(&instance.inputs, ctx, n), n)),
        "dsrf" => Some(dsrf::calculate(&dsrf::DsrfInputs::resolve(&instance.inputs, ctx, n), n)),
        "gstReceivable" => Some(gst::calculate(&gst::GstInputs::resolve(&instance.inputs, ctx, n), n)),
        "mraReserve" => Some(mra::calculate(&mra::MraInputs::resolve(&instance.inputs, ctx, n), n)),
        "amortisation" => Some(amortisation::calculate(&amortisation::AmortisationInputs::resolve(&instance.inputs, ctx, n), n)),
        // debtSizer has its own entry point (`super::debt_sizer::size_debt`) because it
        // needs the timeline, not just the context — invoked directly by the orchestrator.
        _ => None,
    }
}

/// Declared input keys per module type (§4.6, §7). Anything in
/// `instance.inputs` outside this set is a misspelled or stale key, not a
/// calculator parameter — flagged, never silently ignored.
fn known_input_keys(module_type: &str) -> Option<&'static [&'static str]> {
    match module_type {
        "debtSizer" => Some(&[
            "contractedCfads",
            "merchantCfads",
            "contractedDscr",
            "merchantDscr",
            "cfads",
            "dscr",
            "debtFlag",
            "cumulativeFunding",
            "maxGearingPct",
            "interestRate",
            "tenorYears",
            "debtPeriod",
            "tolerance",
            "maxIterations",
        ]),
        "constructionFunding" => Some(&["costs", "gstPaid", "fees", "constructionFlag", "sizedDebt", "gearingCap", "interestRate"]),
        "distributions" => Some(&[
            "cfads",
            "debtService",
            "npat",
            "reserveRequirement",
            "cashAvailable",
            "quarterEndFlag",
            "scCapitalOutstanding",
            "reThreshold",
            "lockupReleaseThreshold",
        ]),
        "dsrf" => Some(&["debtService", "refiFlag", "marginSteps", "opsStartFlag", "lookforwardMonths", "refiFeePct"]),
        "gstReceivable" => Some(&["gstPaid", "gstRefunded"]),
        "mraReserve" => Some(&["maintenanceCapex", "lookforwardMonths"]),
        "amortisation" => Some(&["mode", "usefulLifeMonths", "additions", "onsetAmount"]),
        _ => None,
    }
}

/// Pushes an `UnknownModuleInput` diagnostic for every key in `inputs` that
/// isn't declared for `module_type`. Unknown module types are reported
/// separately via `UnknownModuleType`, so this is a no-op for them.
pub fn validate_input_keys(module_type: &str, instance_id: u32, inputs: &FxHashMap<String, Json>, diagnostics: &mut Vec<Diagnostic>) {
    let Some(known) = known_input_keys(module_type) else { return };
    for key in inputs.keys() {
        if !known.contains(&key.as_str()) {
            diagnostics.push(
                Diagnostic::warning(DiagnosticCode::UnknownModuleInput, format!("unknown input key {key:?} for module type {module_type}"))
                    .with_ref(format!("M{instance_id}")),
            );
        }
    }
}

/// Runs every enabled, non-`debtSizer` module instance and writes its
/// outputs into `ctx`. The debt sizer is dispatched separately by the
/// orchestrator since it needs the [`pf_model::Timeline`], not just the
/// flat context map.
pub fn dispatch_all(modules: &[ModuleInstance], ctx: &mut FxHashMap<String, Vec<f64>>, n: usize, diagnostics: &mut Vec<Diagnostic>) {
    for instance in modules {
        if !instance.enabled || instance.module_type == "debtSizer" {
            continue;
        }
        dispatch_one(instance, ctx, n, diagnostics);
    }
}

fn dispatch_one(instance: &ModuleInstance, ctx: &mut FxHashMap<String, Vec<f64>>, n: usize, diagnostics: &mut Vec<Diagnostic>) {
    let Some(order) = output_order(&instance.module_type) else {
        diagnostics.push(
            Diagnostic::error(DiagnosticCode::UnknownModuleType, format!("unknown module type {}", instance.module_type))
                .with_ref(format!("M{}", instance.id)),
        );
        return;
    };

    validate_input_keys(&instance.module_type, instance.id, &instance.inputs, diagnostics);

    let Some(outputs) = run_calculator(&instance.module_type, instance, ctx, n) else {
        diagnostics.push(
            Diagnostic::error(DiagnosticCode::UnknownModuleType, format!("no calculator registered for {}", instance.module_type))
                .with_ref(format!("M{}", instance.id)),
        );
        return;
    };

    for (k, key) in order.iter().enumerate() {
        let arr = outputs.get(*key).cloned().unwrap_or_else(|| vec![0.0; n]);
        ctx.insert(format!("M{}.{}", instance.id, k + 1), arr);
    }
}

pub fn module_output_order(module_type: &str) -> Option<&'static [&'static str]> {
    output_order(module_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance(id: u32, module_type: &str, inputs: &[(&str, serde_json::Value)]) -> ModuleInstance {
        ModuleInstance {
            id,
            module_type: module_type.to_string(),
            name: "m".to_string(),
            inputs: inputs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            enabled: true,
        }
    }

    #[test]
    fn writes_outputs_under_module_instance_keys() {
        let mut ctx = FxHashMap::default();
        let modules = vec![instance(7, "gstReceivable", &[("gstPaid", json!(10.0)), ("gstRefunded", json!(0.0))])];
        let mut diags = Vec::new();
        dispatch_all(&modules, &mut ctx, 3, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(ctx["M7.1"], vec![10.0, 10.0, 10.0]);
        assert_eq!(ctx["M7.2"], vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn unknown_module_type_yields_diagnostic() {
        let mut ctx = FxHashMap::default();
        let modules = vec![instance(1, "bogus", &[])];
        let mut diags = Vec::new();
        dispatch_all(&modules, &mut ctx, 3, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UnknownModuleType);
    }

    #[test]
    fn unknown_input_key_yields_diagnostic_but_still_runs() {
        let mut ctx = FxHashMap::default();
        let modules = vec![instance(2, "gstReceivable", &[("gstPaid", json!(5.0)), ("gstPaidTypo", json!(5.0))])];
        let mut diags = Vec::new();
        dispatch_all(&modules, &mut ctx, 3, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UnknownModuleInput);
        assert_eq!(ctx["M2.1"], vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn disabled_module_is_skipped() {
        let mut ctx = FxHashMap::default();
        let mut m = instance(1, "gstReceivable", &[]);
        m.enabled = false;
        let mut diags = Vec::new();
        dispatch_all(&[m], &mut ctx, 3, &mut diags);
        assert!(ctx.is_empty());
        assert!(diags.is_empty());
    }
}
