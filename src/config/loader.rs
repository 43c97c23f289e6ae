//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! configuration from YAML files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

use super::types::{ApprovalChain, ComplianceConfig, ComplianceRules, EngineSettings, RuleSet};

/// Loads and provides access to payroll configuration.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── engine.yaml        # Worker pool, SLA, templates, branch rule sets
/// ├── approval.yaml      # Approval chain and correction approver role
/// ├── compliance.yaml    # Statutory thresholds per jurisdiction
/// └── rule_sets/
///     └── standard_usd.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// let rule_set = loader.rule_set_for_branch("branch_north")?;
/// println!("Branch pays in {}", rule_set.currency.code);
/// # Ok::<(), payroll_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
    approval: ApprovalChain,
    compliance: ComplianceConfig,
    rule_sets: HashMap<String, Arc<RuleSet>>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing (`ConfigNotFound`)
    /// - Any file contains invalid YAML (`ConfigParseError`)
    /// - The approval chain or a rule set is inconsistent (`InvalidRuleConfiguration`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let approval = Self::load_yaml::<ApprovalChain>(&path.join("approval.yaml"))?;
        let compliance = Self::load_yaml::<ComplianceConfig>(&path.join("compliance.yaml"))?;
        let rule_sets = Self::load_rule_sets(&path.join("rule_sets"))?;

        let loader = Self::from_parts(settings, approval, compliance, rule_sets)?;
        tracing::info!(
            path = %path.display(),
            rule_sets = loader.rule_sets.len(),
            approval_levels = loader.approval.max_level(),
            "Loaded payroll configuration"
        );
        Ok(loader)
    }

    /// Builds a loader from already-parsed parts, validating them.
    pub fn from_parts(
        settings: EngineSettings,
        approval: ApprovalChain,
        compliance: ComplianceConfig,
        rule_sets: Vec<RuleSet>,
    ) -> EngineResult<Self> {
        approval.validate()?;
        if settings.worker_pool_size == 0 {
            return Err(EngineError::InvalidInput {
                field: "worker_pool_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let mut by_id = HashMap::new();
        for rule_set in rule_sets {
            rule_set.validate()?;
            by_id.insert(rule_set.id.clone(), Arc::new(rule_set));
        }

        let loader = Self {
            settings,
            approval,
            compliance,
            rule_sets: by_id,
        };

        loader.rule_set(&loader.settings.default_rule_set)?;
        for rule_set_id in loader.settings.branch_rule_sets.values() {
            loader.rule_set(rule_set_id)?;
        }
        Ok(loader)
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all rule set files from the rule_sets directory.
    fn load_rule_sets(dir: &Path) -> EngineResult<Vec<RuleSet>> {
        let dir_str = dir.display().to_string();

        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut rule_sets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                rule_sets.push(Self::load_yaml::<RuleSet>(&path)?);
            }
        }

        if rule_sets.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rule set files found)", dir_str),
            });
        }

        Ok(rule_sets)
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the approval chain.
    pub fn approval_chain(&self) -> &ApprovalChain {
        &self.approval
    }

    /// Gets a rule set by id.
    pub fn rule_set(&self, id: &str) -> EngineResult<Arc<RuleSet>> {
        self.rule_sets
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::InvalidRuleConfiguration {
                rule_set: id.to_string(),
                message: "rule set is not configured".to_string(),
            })
    }

    /// Gets the rule set that applies to a branch.
    pub fn rule_set_for_branch(&self, branch_id: &str) -> EngineResult<Arc<RuleSet>> {
        let id = self
            .settings
            .branch_rule_sets
            .get(branch_id)
            .unwrap_or(&self.settings.default_rule_set);
        self.rule_set(id)
    }

    /// Gets the compliance rules of a jurisdiction, if any are configured.
    pub fn compliance_rules(&self, jurisdiction: &str) -> Option<&ComplianceRules> {
        self.compliance.jurisdictions.get(jurisdiction)
    }
}
