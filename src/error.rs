//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during calculation, approval,
//! release and correction of payroll records.

use rust_decimal::Decimal;
use thiserror::Error;

/// The broad category an [`EngineError`] belongs to.
///
/// Callers use the kind to decide how to react: validation errors are the
/// caller's fault, state conflicts are hard stops, concurrent modifications
/// may be retried once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input shape or configuration. Not retried.
    Validation,
    /// An invalid state transition was attempted. Not retried automatically.
    StateConflict,
    /// Another writer holds the subject. Safe to retry once.
    ConcurrentModification,
    /// Upstream input is missing. Requires operator action.
    DataUnavailable,
    /// A computed result broke an invariant (e.g. negative net pay).
    ComputationInvariantViolation,
    /// The actor is not allowed to perform the operation.
    Forbidden,
    /// A side channel (audit log, renderer, worker) failed.
    Internal,
}

impl ErrorKind {
    /// Returns true if an operation failing with this kind may be retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ConcurrentModification)
    }
}

/// The main error type for the Payroll Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::{EngineError, ErrorKind};
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// assert_eq!(error.kind(), ErrorKind::Validation);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A caller-supplied value was malformed.
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// The offending field.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// The pay period cannot be calculated.
    #[error("Invalid pay period {period}: {message}")]
    InvalidPeriod {
        /// The period, formatted as `YYYY-MM`.
        period: String,
        /// Why the period was refused.
        message: String,
    },

    /// The rule set is inconsistent or incomplete.
    #[error("Invalid rule configuration in '{rule_set}': {message}")]
    InvalidRuleConfiguration {
        /// The rule set identifier.
        rule_set: String,
        /// A description of the problem.
        message: String,
    },

    /// A payroll record version does not exist.
    #[error("Payroll record not found: {record}")]
    RecordNotFound {
        /// The record reference that was looked up.
        record: String,
    },

    /// An error correction does not exist.
    #[error("Error correction not found: {correction}")]
    CorrectionNotFound {
        /// The correction identifier that was looked up.
        correction: String,
    },

    /// Required input data for an employee was absent.
    #[error("Missing input data for employee '{employee_id}': {field}")]
    MissingInputData {
        /// The employee whose inputs were incomplete.
        employee_id: String,
        /// The missing field.
        field: String,
    },

    /// The input provider could not supply data for an employee.
    #[error("Input data unavailable for employee '{employee_id}': {message}")]
    InputUnavailable {
        /// The employee whose inputs could not be fetched.
        employee_id: String,
        /// A description supplied by the provider.
        message: String,
    },

    /// Deductions exceed gross pay.
    #[error("Negative net pay {net} for employee '{employee_id}' requires manual review")]
    NegativeNetPay {
        /// The employee concerned.
        employee_id: String,
        /// The computed (negative) net amount.
        net: Decimal,
    },

    /// The subject is not in a state that allows the operation.
    #[error("Invalid state for {subject}: expected {expected}, found {actual}")]
    InvalidState {
        /// The subject (record or correction) concerned.
        subject: String,
        /// The state(s) the operation requires.
        expected: String,
        /// The state the subject is in.
        actual: String,
    },

    /// An approval decision targeted a level other than the pending one.
    #[error("Approval level mismatch for {record}: pending level is {pending}, got {requested}")]
    LevelMismatch {
        /// The record concerned.
        record: String,
        /// The record's current pending level.
        pending: u8,
        /// The level named in the request.
        requested: u8,
    },

    /// A released record can only change through an error correction.
    #[error("Record {record} is {status}; changes require an error correction")]
    RequiresCorrection {
        /// The record concerned.
        record: String,
        /// Its current status.
        status: String,
    },

    /// A correction targeted a record that is not the released chain head.
    #[error("Record {record} is not the current released version (status {status})")]
    RecordNotReleased {
        /// The record concerned.
        record: String,
        /// Its current status.
        status: String,
    },

    /// The correction was already processed.
    #[error("Error correction {correction} was already processed")]
    AlreadyProcessed {
        /// The correction concerned.
        correction: String,
    },

    /// Another operation is mutating the same subject.
    #[error("Concurrent modification of {subject}")]
    ConcurrentModification {
        /// The subject being mutated.
        subject: String,
    },

    /// A processing run for the same branch and period is in flight.
    #[error("Payroll processing already in progress for branch '{branch_id}' period {period}")]
    ProcessingInProgress {
        /// The branch concerned.
        branch_id: String,
        /// The period, formatted as `YYYY-MM`.
        period: String,
    },

    /// The actor lacks the role required by the operation.
    #[error("Actor '{actor}' is not authorized: requires role '{required_role}'")]
    Unauthorized {
        /// The actor that attempted the operation.
        actor: String,
        /// The role that would have been required.
        required_role: String,
    },

    /// The audit trail could not be written.
    #[error("Audit write failed: {message}")]
    AuditWriteFailed {
        /// A description of the underlying failure.
        message: String,
    },

    /// The payslip document could not be rendered.
    #[error("Payslip rendering failed for {record}: {message}")]
    RenderFailed {
        /// The record being released.
        record: String,
        /// A description supplied by the renderer.
        message: String,
    },

    /// A per-employee worker terminated abnormally.
    #[error("Worker for employee '{employee_id}' failed: {message}")]
    WorkerFailed {
        /// The employee being processed.
        employee_id: String,
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Returns the taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidInput { .. }
            | EngineError::InvalidPeriod { .. }
            | EngineError::InvalidRuleConfiguration { .. }
            | EngineError::RecordNotFound { .. }
            | EngineError::CorrectionNotFound { .. } => ErrorKind::Validation,
            EngineError::InvalidState { .. }
            | EngineError::LevelMismatch { .. }
            | EngineError::RequiresCorrection { .. }
            | EngineError::RecordNotReleased { .. }
            | EngineError::AlreadyProcessed { .. } => ErrorKind::StateConflict,
            EngineError::ConcurrentModification { .. }
            | EngineError::ProcessingInProgress { .. } => ErrorKind::ConcurrentModification,
            EngineError::MissingInputData { .. } | EngineError::InputUnavailable { .. } => {
                ErrorKind::DataUnavailable
            }
            EngineError::NegativeNetPay { .. } => ErrorKind::ComputationInvariantViolation,
            EngineError::Unauthorized { .. } => ErrorKind::Forbidden,
            EngineError::AuditWriteFailed { .. }
            | EngineError::RenderFailed { .. }
            | EngineError::WorkerFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true when the operation had already been completed earlier,
    /// so a retrying caller can treat the failure as success.
    pub fn is_already_done(&self) -> bool {
        matches!(self, EngineError::AlreadyProcessed { .. })
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
