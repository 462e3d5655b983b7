//! Unit filtering ahead of injection.

mod units;

pub use units::{filter_units, UnitFilterResult, UnitQualification};
