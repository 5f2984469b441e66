//! The iterative DSCR-sculpted debt sizer (§4.7) — the one module whose
//! output is a fixed-point search rather than a forward pass.

use pf_common::value::safe_div;
use pf_model::{Frequency, Timeline};

#[derive(Debug, Clone)]
pub struct DebtSizerInputs {
    pub contracted_cfads: Vec<f64>,
    pub merchant_cfads: Vec<f64>,
    pub contracted_dscr: f64,
    pub merchant_dscr: f64,
    /// Legacy single-CFADS path (§4.7 step 1): when both are supplied, a
    /// single CFADS series divided by a single DSCR replaces the
    /// contracted/merchant split entirely.
    pub legacy_cfads: Option<Vec<f64>>,
    pub legacy_dscr: Option<f64>,
    pub debt_flag: Vec<f64>,
    /// Cumulative funding drawn, sampled at `max(debt_start - 1, 0)`.
    pub cumulative_funding: Vec<f64>,
    pub max_gearing_pct: f64,
    /// Monthly interest rate (% p.a.), as a time series (§4.7).
    pub interest_rate_pct: Vec<f64>,
    pub tenor_years: f64,
    pub debt_period: Frequency,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CapacitySchedule {
    pub opening_balance: Vec<f64>,
    pub interest_payment: Vec<f64>,
    pub principal_payment: Vec<f64>,
    pub debt_service: Vec<f64>,
    pub closing_balance: Vec<f64>,
    pub period_dscr: Vec<f64>,
    pub cumulative_principal: Vec<f64>,
    pub fully_repaid: bool,
    pub dscr_breached: bool,
    pub has_negative_principal: bool,
    pub pays_off_early: bool,
}

#[derive(Debug, Clone)]
pub struct SolverLog {
    pub iterations: u32,
    pub converged: bool,
    pub final_tolerance: f64,
    pub sized_debt: f64,
    pub max_gearing_cap: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DebtSizerOutputs {
    pub sized_debt: Vec<f64>,
    pub opening_balance: Vec<f64>,
    pub interest_payment: Vec<f64>,
    pub principal_payment: Vec<f64>,
    pub debt_service: Vec<f64>,
    pub closing_balance: Vec<f64>,
    pub period_dscr: Vec<f64>,
    pub cumulative_principal: Vec<f64>,
}

pub struct ModuleOutcome {
    pub outputs: DebtSizerOutputs,
    pub solver_log: SolverLog,
}

fn is_viable(s: &CapacitySchedule) -> bool {
    s.fully_repaid && !s.dscr_breached && !s.has_negative_principal && !s.pays_off_early
}

fn pays_off_early_but_otherwise_viable(s: &CapacitySchedule) -> bool {
    s.fully_repaid && !s.dscr_breached && !s.has_negative_principal && s.pays_off_early
}

/// Counts how many period-ends at `freq` occur in `[from, to]` inclusive.
fn period_end_count(timeline: &Timeline, freq: Frequency, from: usize, to: usize) -> usize {
    if from > to {
        return 0;
    }
    (from..=to).filter(|&i| timeline.is_period_end(i, freq)).count()
}

/// Step 4.7.1: generates the amortisation schedule capacity would support
/// for a candidate debt amount `d`.
pub fn generate_capacity_schedule(
    timeline: &Timeline,
    debt_start: usize,
    debt_end: usize,
    d: f64,
    capacity: &[f64],
    cfads: &[f64],
    interest_rate_pct: &[f64],
    period: Frequency,
) -> CapacitySchedule {
    let n = timeline.n;
    let mut out = CapacitySchedule {
        opening_balance: vec![0.0; n],
        interest_payment: vec![0.0; n],
        principal_payment: vec![0.0; n],
        debt_service: vec![0.0; n],
        closing_balance: vec![0.0; n],
        period_dscr: vec![0.0; n],
        cumulative_principal: vec![0.0; n],
        fully_repaid: false,
        dscr_breached: false,
        has_negative_principal: false,
        pays_off_early: false,
    };

    let mut balance = d;
    let mut accrued_interest = 0.0;
    let mut accrued_capacity = 0.0;
    let mut accrued_cfads = 0.0;
    let mut cumulative_principal = 0.0;

    let total_payment_periods = period_end_count(timeline, period, debt_start, debt_end);
    let mut payoff_count: Option<usize> = None;
    let mut periods_seen = 0usize;

    for i in debt_start..=debt_end.min(n.saturating_sub(1)) {
        out.opening_balance[i] = balance;
        let monthly_interest = balance * interest_rate_pct[i] / 100.0 / 12.0;
        accrued_interest += monthly_interest;
        accrued_capacity += capacity[i];
        accrued_cfads += cfads[i];

        let is_end = timeline.is_period_end(i, period) || i == debt_end;
        if is_end {
            periods_seen += 1;
            let interest = accrued_interest;
            let max_debt_service = accrued_capacity;
            let remaining_periods = period_end_count(timeline, period, i, debt_end).max(1);
            let min_principal_for_tenor = safe_div(balance, remaining_periods as f64);
            let max_principal_from_capacity = (max_debt_service - interest).max(0.0);

            let mut principal = if i == debt_end {
                balance
            } else if balance <= 0.0 {
                0.0
            } else if max_principal_from_capacity < min_principal_for_tenor {
                if max_principal_from_capacity < 0.5 * min_principal_for_tenor {
                    out.dscr_breached = true;
                }
                max_principal_from_capacity
            } else if remaining_periods > 1 {
                let min_required_balance = min_principal_for_tenor * (remaining_periods - 1) as f64;
                let max_allowed = (balance - min_required_balance).max(0.0);
                min_principal_for_tenor.max(max_principal_from_capacity.min(max_allowed))
            } else {
                max_principal_from_capacity.min(balance)
            };

            if principal < 0.0 {
                out.has_negative_principal = true;
            }
            principal = principal.min(balance);

            let debt_service = interest + principal;
            let closing = balance - principal;

            out.interest_payment[i] = interest;
            out.principal_payment[i] = principal;
            out.debt_service[i] = debt_service;
            out.period_dscr[i] = safe_div(accrued_cfads, debt_service);
            out.closing_balance[i] = closing;
            cumulative_principal += principal;
            out.cumulative_principal[i] = cumulative_principal;

            if payoff_count.is_none() && closing < 0.001 {
                payoff_count = Some(periods_seen);
            }

            balance = closing;
            accrued_interest = 0.0;
            accrued_capacity = 0.0;
            accrued_cfads = 0.0;
        } else {
            out.closing_balance[i] = balance;
            out.cumulative_principal[i] = cumulative_principal;
        }
    }

    for i in (debt_end + 1)..n {
        out.closing_balance[i] = balance;
        out.cumulative_principal[i] = cumulative_principal;
    }

    out.fully_repaid = balance < 0.001;
    out.pays_off_early = match payoff_count {
        Some(count) => total_payment_periods.saturating_sub(count) > 2,
        None => false,
    };

    out
}

/// Step 4.7: the full iterative sizing search.
pub fn size_debt(timeline: &Timeline, inputs: &DebtSizerInputs) -> ModuleOutcome {
    let n = timeline.n;
    let (capacity, total_cfads): (Vec<f64>, Vec<f64>) = match (&inputs.legacy_cfads, inputs.legacy_dscr) {
        (Some(cfads), Some(dscr)) => ((0..n).map(|i| safe_div(cfads[i], dscr)).collect(), cfads.clone()),
        _ => (
            (0..n)
                .map(|i| safe_div(inputs.contracted_cfads[i], inputs.contracted_dscr) + safe_div(inputs.merchant_cfads[i], inputs.merchant_dscr))
                .collect(),
            (0..n).map(|i| inputs.contracted_cfads[i] + inputs.merchant_cfads[i]).collect(),
        ),
    };

    let debt_start = inputs.debt_flag.iter().position(|&x| x != 0.0);
    let debt_flag_end = inputs.debt_flag.iter().rposition(|&x| x != 0.0);

    let (debt_start, debt_flag_end) = match (debt_start, debt_flag_end) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return ModuleOutcome {
                outputs: DebtSizerOutputs {
                    sized_debt: vec![0.0; n],
                    ..Default::default()
                },
                solver_log: SolverLog {
                    iterations: 0,
                    converged: false,
                    final_tolerance: inputs.tolerance,
                    sized_debt: 0.0,
                    max_gearing_cap: 0.0,
                },
            };
        }
    };

    let tenor_months = (inputs.tenor_years * 12.0).round() as usize;
    let debt_end = (debt_start + tenor_months).saturating_sub(1).min(debt_flag_end).min(n - 1);

    let funding_basis_idx = debt_start.saturating_sub(1).max(0).min(n - 1);
    let funding_basis = inputs.cumulative_funding.get(funding_basis_idx).copied().unwrap_or(0.0);
    let max_debt = funding_basis * inputs.max_gearing_pct / 100.0;

    let mut lo = 0.0_f64;
    let mut hi = max_debt;
    let mut best: Option<(f64, CapacitySchedule)> = None;
    let mut iterations = 0u32;

    while iterations < inputs.max_iterations && hi - lo > inputs.tolerance {
        let mid = (lo + hi) / 2.0;
        let schedule = generate_capacity_schedule(timeline, debt_start, debt_end, mid, &capacity, &total_cfads, &inputs.interest_rate_pct, inputs.debt_period);
        if is_viable(&schedule) {
            lo = mid;
            best = Some((mid, schedule));
        } else if pays_off_early_but_otherwise_viable(&schedule) {
            lo = mid;
        } else {
            hi = mid;
        }
        iterations += 1;
    }

    // Secondary search: push towards the gearing cap if the best found still
    // pays off early and headroom to maxDebt remains (§4.7 step 6).
    if let Some((best_amount, best_schedule)) = &best {
        if best_schedule.pays_off_early && *best_amount < max_debt - inputs.tolerance {
            let mut lo2 = *best_amount;
            let mut hi2 = max_debt;
            for _ in 0..15 {
                if hi2 - lo2 <= inputs.tolerance {
                    break;
                }
                let mid = (lo2 + hi2) / 2.0;
                let schedule =
                    generate_capacity_schedule(timeline, debt_start, debt_end, mid, &capacity, &total_cfads, &inputs.interest_rate_pct, inputs.debt_period);
                iterations += 1;
                if is_viable(&schedule) {
                    lo2 = mid;
                    best = Some((mid, schedule));
                } else if pays_off_early_but_otherwise_viable(&schedule) {
                    lo2 = mid;
                } else {
                    hi2 = mid;
                }
            }
        }
    }

    match best {
        Some((amount, schedule)) => ModuleOutcome {
            outputs: DebtSizerOutputs {
                sized_debt: vec![amount; n],
                opening_balance: schedule.opening_balance,
                interest_payment: schedule.interest_payment,
                principal_payment: schedule.principal_payment,
                debt_service: schedule.debt_service,
                closing_balance: schedule.closing_balance,
                period_dscr: schedule.period_dscr,
                cumulative_principal: schedule.cumulative_principal,
            },
            solver_log: SolverLog {
                iterations,
                converged: true,
                final_tolerance: hi - lo,
                sized_debt: amount,
                max_gearing_cap: max_debt,
            },
        },
        None => ModuleOutcome {
            outputs: DebtSizerOutputs {
                sized_debt: vec![0.0; n],
                ..Default::default()
            },
            solver_log: SolverLog {
                iterations,
                converged: false,
                final_tolerance: hi - lo,
                sized_debt: 0.0,
                max_gearing_cap: max_debt,
            },
        },
    }
}
