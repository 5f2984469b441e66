pub mod config;
pub mod group;
pub mod input;
pub mod lowering;
pub mod registry;
pub mod timeline;
pub mod workbook;

pub use config::Config;
pub use group::{EntryMode, Frequency, Group, SpreadMethod, SubGroup};
pub use input::{Calculation, Input, KeyPeriod, ModuleInstance};
pub use registry::ReferenceRegistry;
pub use timeline::Timeline;
pub use workbook::Workbook;
