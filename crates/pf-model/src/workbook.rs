//! The host-persisted wire format (§6): `{ config, groups, inputs,
//! keyPeriods, calculations, modules }`. The engine does not define this
//! format — it only requires the data model in §3 — but a JSON host needs
//! somewhere to deserialize into, so this mirrors the shape 1:1.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::group::Group;
use crate::input::{Calculation, Input, KeyPeriod, ModuleInstance};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub config: Config,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub key_periods: Vec<KeyPeriod>,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
    #[serde(default)]
    pub modules: Vec<ModuleInstance>,
}
