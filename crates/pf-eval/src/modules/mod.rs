//! Module calculators (§4.5, §4.7, §4.8). Each module reads its declared
//! inputs out of the evaluation context via [`resolve`] and writes its
//! outputs back under `M{instanceId}.{key}`.

pub mod amortisation;
pub mod construction_funding;
pub mod debt_sizer;
pub mod dispatch;
pub mod distributions;
pub mod dsrf;
pub mod gst;
pub mod mra;
pub mod resolve;
