//! Role assignment and extraction order for archive members.
//!
//! Roles come from an ordered table of filename patterns; the first pattern
//! that matches wins and anything unmatched is [`FileRole::Payload`].

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{ArchiveEntry, FileRole};
use crate::error::CcviError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub pattern: String,
    pub role: FileRole,
}

impl RoleRule {
    pub fn new(pattern: impl Into<String>, role: FileRole) -> Self {
        Self {
            pattern: pattern.into(),
            role,
        }
    }
}

pub fn default_role_rules() -> Vec<RoleRule> {
    vec![
        RoleRule::new(r"^README\.md$", FileRole::StructureDoc),
        RoleRule::new(r"exposure.*\.parquet$", FileRole::PrimaryTimeSeries),
    ]
}

#[derive(Debug, Clone)]
pub struct RolePredicates {
    rules: Vec<(Regex, FileRole)>,
}

impl RolePredicates {
    pub fn new(rules: &[RoleRule]) -> Result<Self, CcviError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| (regex, rule.role))
                    .map_err(|err| CcviError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, CcviError>>()?;
        Ok(Self { rules })
    }

    pub fn role_of(&self, entry: &ArchiveEntry) -> FileRole {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(&entry.filename))
            .map(|(_, role)| *role)
            .unwrap_or(FileRole::Payload)
    }

    pub fn classify(&self, entries: &[ArchiveEntry]) -> Vec<(ArchiveEntry, FileRole)> {
        entries
            .iter()
            .map(|entry| (entry.clone(), self.role_of(entry)))
            .collect()
    }
}

impl Default for RolePredicates {
    fn default() -> Self {
        let rules = default_role_rules()
            .into_iter()
            .filter_map(|rule| Regex::new(&rule.pattern).ok().map(|regex| (regex, rule.role)))
            .collect();
        Self { rules }
    }
}

/// Largest entries first. The sort is stable, so equal sizes keep their
/// listing order.
pub fn order_for_extraction(entries: &[ArchiveEntry]) -> Vec<ArchiveEntry> {
    let mut ordered = entries.to_vec();
    ordered.sort_by(|a, b| b.byte_size.cmp(&a.byte_size));
    ordered
}
