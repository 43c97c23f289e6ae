//! Payroll Calculation and Correction Engine
//!
//! This crate computes gross-to-net pay for employees of a branch, carries the
//! resulting payroll records through a multi-level approval chain to release,
//! and applies audited corrections to released records as new versions.

#![warn(missing_docs)]

pub mod audit;
pub mod calculation;
pub mod clock;
pub mod collaborators;
pub mod compliance;
pub mod config;
pub mod correction;
pub mod error;
pub mod lease;
pub mod models;
pub mod processing;
pub mod state;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;
