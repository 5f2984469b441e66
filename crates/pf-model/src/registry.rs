//! The reference registry (§4.2): resolves a parsed [`Ref`] to a length-`N`
//! array, or `None` if the ref is invalid / nothing is entered against it.
//!
//! Only the "entity" refs (`V`, `C`, `S`, `F`, `I`) are served here — `R`
//! (calculation results) and `M` (module outputs) only exist once
//! evaluation has produced a context, and are resolved by `pf-eval`.

use pf_common::Ref;

use crate::config::Config;
use crate::group::{EntryMode, Group};
use crate::input::Input;
use crate::lowering;
use crate::timeline::Timeline;

pub struct ReferenceRegistry<'a> {
    config: &'a Config,
    timeline: &'a Timeline,
    groups: &'a [Group],
    inputs: &'a [Input],
}

impl<'a> ReferenceRegistry<'a> {
    pub fn new(config: &'a Config, timeline: &'a Timeline, groups: &'a [Group], inputs: &'a [Input]) -> Self {
        Self {
            config,
            timeline,
            groups,
            inputs,
        }
    }

    pub fn resolve(&self, r: &Ref) -> Option<Vec<f64>> {
        match *r {
            Ref::Values { group, item } | Ref::Constant { group, item } | Ref::Series { group, item } => {
                let g = self.groups.iter().find(|g| g.id == group)?;
                match item {
                    Some(ordinal) => self.resolve_item_ordinal(g, ordinal as usize),
                    None => Some(self.group_total(g)),
                }
            }
            Ref::Flag { id } => self.resolve_standalone(id),
            Ref::Indexation { id } => self.resolve_standalone(id),
            Ref::Calculation { .. } | Ref::Module { .. } => None,
        }
    }

    /// `F{id}` / `I{id}` reference a bare input by its own id, not a group
    /// member — read its stored monthly map, falling back to a constant
    /// broadcast of `value` when nothing was entered per-month.
    fn resolve_standalone(&self, id: u32) -> Option<Vec<f64>> {
        let input = self.inputs.iter().find(|i| i.id == id)?;
        let n = self.timeline.n;
        if input.values.is_empty() {
            let v = input.value.unwrap_or(0.0);
            Some(vec![v; n])
        } else {
            Some(lowering::lower_values(input, n))
        }
    }

    fn items_for_group(&self, group_id: u32) -> Vec<&Input> {
        let mut items: Vec<&Input> = self.inputs.iter().filter(|i| i.group_id == group_id).collect();
        items.sort_by_key(|i| i.id);
        items
    }

    /// Lowers a single group member according to the group's entry mode.
    fn lower_item(&self, group: &Group, input: &Input) -> Vec<f64> {
        let n = self.timeline.n;
        match group.entry_mode {
            EntryMode::Values => lowering::lower_values(input, n),
            EntryMode::Constant => {
                let method = input.spread_method.unwrap_or(self.config.default_spread_method);
                lowering::lower_constant(input.value.unwrap_or(0.0), method, n)
            }
            EntryMode::Series => lowering::lower_series(input, self.timeline),
            EntryMode::Lookup | EntryMode::Lookup2 => lowering::lower_lookup(input, n, self.config.prefill_lookups),
            EntryMode::Formula | EntryMode::Label => vec![0.0; n],
        }
    }

    /// `V{g}.{k}`: `k` is the stable ordinal (1-indexed, ascending input id)
    /// of the member within the group, per §9's resolution of the
    /// sub-item-numbering open question.
    fn resolve_item_ordinal(&self, group: &Group, ordinal: usize) -> Option<Vec<f64>> {
        if ordinal == 0 {
            return None;
        }
        let items = self.items_for_group(group.id);
        let input = items.get(ordinal - 1)?;
        Some(self.lower_item(group, input))
    }

    /// `V{g}` / `C{g}` / `S{g}`: the sum of all member arrays, unless the
    /// group is in "selected option" mode (§4.2), in which case it resolves
    /// to just the currently selected subgroup's (or item's) array.
    fn group_total(&self, group: &Group) -> Vec<f64> {
        let n = self.timeline.n;
        let items = self.items_for_group(group.id);

        if group.show_selected {
            if group.subgroups.is_empty() {
                let idx = *group.selected_indices.get(Group::ROOT_KEY).unwrap_or(&0);
                return items.get(idx).map(|i| self.lower_item(group, i)).unwrap_or_else(|| vec![0.0; n]);
            }
            let idx = *group.selected_indices.get(Group::ROOT_KEY).unwrap_or(&0);
            let Some(chosen) = group.subgroups.get(idx) else {
                return vec![0.0; n];
            };
            return self.sum_items(group, items.iter().filter(|i| i.subgroup_id == Some(chosen.id)).copied());
        }

        self.sum_items(group, items.into_iter())
    }

    fn sum_items<'b>(&self, group: &Group, items: impl Iterator<Item = &'b Input>) -> Vec<f64> {
        let n = self.timeline.n;
        let mut total = vec![0.0; n];
        for input in items {
            let arr = self.lower_item(group, input);
            for (t, a) in total.iter_mut().zip(arr.iter()) {
                *t += a;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Frequency, SpreadMethod};
    use rustc_hash::FxHashMap;

    fn make_timeline(n: u32) -> Timeline {
        let cfg = Config {
            start_year: 2024,
            start_month: 1,
            end_year: 2024 + (n as i32 - 1) / 12,
            end_month: ((n - 1) % 12) + 1,
            fy_start_month: 1,
            prefill_lookups: false,
            default_spread_method: SpreadMethod::Lookup,
        };
        Timeline::from_config(&cfg).unwrap()
    }

    fn values_input(id: u32, group_id: u32, monthly: f64, n: usize) -> Input {
        let mut values = FxHashMap::default();
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

    #[test]
    fn group_simple_ref_sums_items() {
        let timeline = make_timeline(12);
        let cfg = Config {
            start_year: 2024,
            start_month: 1,
            end_year: 2024,
            end_month: 12,
            fy_start_month: 1,
            prefill_lookups: false,
            default_spread_method: SpreadMethod::Lookup,
        };
        let group = Group {
            id: 1,
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
            selected_indices: FxHashMap::default(),
            show_selected: false,
        };
        let inputs = vec![values_input(1, 1, 10.0, 12), values_input(2, 1, 5.0, 12)];
        let registry = ReferenceRegistry::new(&cfg, &timeline, &[group], &inputs);

        let total = registry.resolve(&Ref::Values { group: 1, item: None }).unwrap();
        assert_eq!(total, vec![15.0; 12]);

        let first = registry.resolve(&Ref::Values { group: 1, item: Some(1) }).unwrap();
        assert_eq!(first, vec![10.0; 12]);
    }
}
