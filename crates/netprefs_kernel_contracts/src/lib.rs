#![forbid(unsafe_code)]

pub mod common;
pub mod roaming;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
