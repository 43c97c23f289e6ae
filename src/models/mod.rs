//! Core data models for the Payroll Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod actor;
mod approval;
mod audit_entry;
mod correction;
mod event;
mod inputs;
mod money;
mod pay_period;
mod payroll_record;

pub use actor::Actor;
pub use approval::{ApprovalStep, Decision, is_complete_approval};
pub use audit_entry::{AuditEntry, SubjectType};
pub use correction::{CorrectionId, CorrectionStatus, CorrectionType, ErrorCorrection};
pub use event::PayrollEvent;
pub use inputs::{EmployeeInputs, NamedAmount};
pub use money::{Currency, ExchangeRateSnapshot, round_money};
pub use pay_period::PayPeriod;
pub use payroll_record::{
    CalculationStep, ComponentKind, ComponentSide, PayComponent, PayrollKey, PayrollRecord,
    RecordId, RecordRef, RecordStatus, RuleSetRef,
};
