//! This crate contains general types, constants and the wire codec that need to be shared across
//! multiple crates.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod constants;
pub mod types;
pub mod wire;
