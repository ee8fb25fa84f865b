// src/audit/mod.rs
pub mod models;
pub mod tristate;

pub use models::*;
pub use tristate::Tristate;
