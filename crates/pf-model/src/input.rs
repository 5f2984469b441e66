use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::group::{Frequency, SpreadMethod};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateYm {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub id: u32,
    pub group_id: u32,
    #[serde(default)]
    pub subgroup_id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub ref_name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub spread_method: Option<SpreadMethod>,
    /// Stored values, always keyed by absolute month index from model start
    /// (§3 Invariants), regardless of the group's display frequency.
    #[serde(default)]
    pub values: FxHashMap<usize, f64>,
    #[serde(default)]
    pub series_annual_value: Option<f64>,
    #[serde(default)]
    pub series_frequency: Option<Frequency>,
    #[serde(default)]
    pub series_payment_month: Option<u32>,
    #[serde(default)]
    pub series_start_date: Option<DateYm>,
    #[serde(default)]
    pub series_end_date: Option<DateYm>,
    /// True when the end bound was chosen via the "Range End" option
    /// (inclusive, extends through N-1) rather than an explicit end date
    /// (end-exclusive) — see §9 open question on series range conventions.
    #[serde(default)]
    pub series_range_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPeriod {
    pub id: u32,
    pub name: String,
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: u32,
    #[serde(default, rename = "ref")]
    pub ref_name: Option<String>,
    pub name: String,
    pub formula: String,
}

impl Calculation {
    /// `ref` defaults to `R{id}` when not explicitly set (§3).
    pub fn reference(&self) -> String {
        self.ref_name.clone().unwrap_or_else(|| format!("R{}", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInstance {
    pub id: u32,
    pub module_type: String,
    pub name: String,
    #[serde(default)]
    pub inputs: FxHashMap<String, serde_json::Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
