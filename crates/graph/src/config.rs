use serde::{Deserialize, Serialize};

/// Configuration of one graph editing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// What to do when references to a deleted module or call survive its removal
    pub unclean_deletion: UncleanDeletionPolicy,

    /// Prefix of automatically generated group names (`Group_1`, `Group_2`, ...)
    pub group_name_prefix: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            unclean_deletion: UncleanDeletionPolicy::LogAndContinue,
            group_name_prefix: "Group_".to_string(),
        }
    }
}

impl GraphConfig {
    /// Keep editing responsive: log corruption and carry on
    pub fn interactive() -> Self {
        Self::default()
    }

    /// Refuse to finish a deletion that leaves references behind
    pub fn strict() -> Self {
        Self {
            unclean_deletion: UncleanDeletionPolicy::Strict,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.group_name_prefix.trim().is_empty() {
            return Err("group_name_prefix must not be empty".to_string());
        }
        if self.group_name_prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err(format!(
                "group_name_prefix '{}' must not contain digits",
                self.group_name_prefix
            ));
        }
        Ok(())
    }
}

/// Handling of references that outlive a deleted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncleanDeletionPolicy {
    /// Log an error, complete the deletion, report `false`
    LogAndContinue,

    /// Leave the entity in place and fail with `GraphError::UncleanDeletion`
    Strict,
}

impl Default for UncleanDeletionPolicy {
    fn default() -> Self {
        Self::LogAndContinue
    }
}
