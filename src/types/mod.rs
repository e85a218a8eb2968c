// tabpool shared type definitions
// Each submodule defines types used across the crate.

pub mod errors;
pub mod state;
pub mod tab;
