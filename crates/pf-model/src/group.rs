use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    M,
    Q,
    Y,
    FY,
}

impl Frequency {
    pub fn months_per_period(self) -> usize {
        match self {
            Frequency::M => 1,
            Frequency::Q => 3,
            Frequency::Y | Frequency::FY => 12,
        }
    }

    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::M => 12.0,
            Frequency::Q => 4.0,
            Frequency::Y | Frequency::FY => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    Values,
    Constant,
    Series,
    Lookup,
    Lookup2,
    Formula,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadMethod {
    Lookup,
    Spread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubGroup {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupWindow {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u32,
    pub name: String,
    pub entry_mode: EntryMode,
    pub frequency: Frequency,
    #[serde(default)]
    pub linked_key_period_id: Option<u32>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub start_month: Option<u32>,
    #[serde(default)]
    pub periods: Option<u32>,
    #[serde(default)]
    pub lookup_start: Option<LookupWindow>,
    #[serde(default)]
    pub lookup_end: Option<LookupWindow>,
    #[serde(default)]
    pub subgroups: Vec<SubGroup>,
    /// Keyed by subgroup id as a string, or the literal `"root"` when the
    /// group has no subgroups — selects one item's array as the group's
    /// "currently selected option" (§4.2) instead of the plain sum.
    #[serde(default)]
    pub selected_indices: FxHashMap<String, usize>,
    #[serde(default)]
    pub show_selected: bool,
}

impl Group {
    pub const ROOT_KEY: &'static str = "root";
}
