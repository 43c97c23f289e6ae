//! Configuration loading and management for the Payroll Engine.
//!
//! This module provides functionality to load payroll configuration from YAML
//! files: engine settings, the approval chain, compliance thresholds and the
//! rule sets used by the calculator.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Approval levels: {}", config.approval_chain().max_level());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AllowanceRule, ApprovalChain, ApprovalLevel, ComplianceConfig, ComplianceRules,
    DeductionBasis, DeductionRule, EngineSettings, ExchangeRate, RuleSet,
};
