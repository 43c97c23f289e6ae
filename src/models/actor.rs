//! Actor identity threaded into every mutating call.

use serde::{Deserialize, Serialize};

/// The person or process performing an operation, with the roles it holds.
///
/// # Examples
///
/// ```
/// use payroll_engine::models::Actor;
///
/// let manager = Actor::new("u-17", ["payroll_officer", "hr_manager"]);
/// assert!(manager.has_role("hr_manager"));
/// assert!(!manager.has_role("finance_director"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identity recorded in audit entries.
    pub id: String,
    /// Roles granted to the actor.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    /// Creates an actor with the given roles.
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an actor for an automated process, holding no roles.
    pub fn system(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    /// Returns true if the actor holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
