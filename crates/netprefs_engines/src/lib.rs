#![forbid(unsafe_code)]

pub mod roaming;
